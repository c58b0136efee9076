pub mod backend {
    tonic::include_proto!("edu.backend");
}

mod ids;
