use paste::paste;
use sea_orm_migration::prelude::*;

static UPDATE_AT: &str = "DEFAULT CURRENT_TIMESTAMP";
static CREATE_AT: &str = "DEFAULT CURRENT_TIMESTAMP";

macro_rules! index {
    ($manager:expr,$table:ident,$col:ident) => {
        paste! {
            $manager
            .create_index(
                Index::create()
                    .name(
                        concat!(
                            "idx-",
                            stringify!($table),
                            "-",
                            stringify!($col),
                        ).to_lowercase()
                    )
                    .table($table::Table)
                    .col($table::$col)
                    .to_owned(),
            )
            .await?;
        }
    };
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Role,
    Username,
    DisplayName,
    Password,
    CreateAt,
}

#[derive(Iden)]
enum Classroom {
    Table,
    Id,
    Host,
    Title,
    Description,
    JoinCode,
    CreateAt,
    UpdateAt,
}

#[derive(Iden)]
enum Enrollment {
    Table,
    Id,
    ClassroomId,
    UserId,
    RosterNumber,
    CreateAt,
}

#[derive(Iden)]
enum Problem {
    Table,
    Id,
    UserId,
    Title,
    Content,
    Difficulty,
    Category,
    MatchRule,
    Public,
    CreateAt,
    UpdateAt,
}

#[derive(Iden)]
enum Testcase {
    Table,
    Id,
    ProblemId,
    Input,
    Output,
    Sequence,
}

#[derive(Iden)]
enum Assignment {
    Table,
    Id,
    ClassroomId,
    ProblemId,
    AiLevel,
    Gallery,
    Sequence,
}

#[derive(Iden)]
enum Submit {
    Table,
    Id,
    UserId,
    ProblemId,
    ClassroomId,
    UploadAt,
    Committed,
    Code,
    PassCase,
    TotalCase,
    Accept,
    Score,
    Grade,
    Feedback,
}

#[derive(Iden)]
enum Chat {
    Table,
    Id,
    UserId,
    ProblemId,
    ClassroomId,
    Role,
    Payload,
    CreateAt,
}

#[derive(Iden)]
enum Token {
    Table,
    Id,
    UserId,
    Rand,
    Role,
    Expiry,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Role).integer().not_null().default(1))
                    .col(ColumnDef::new(User::Username).text().not_null())
                    .col(
                        ColumnDef::new(User::DisplayName)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(User::Password).binary().not_null())
                    .col(
                        ColumnDef::new(User::CreateAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-user-username")
                    .table(User::Table)
                    .col(User::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Classroom::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Classroom::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Classroom::Host).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-classroom-user")
                            .from(Classroom::Table, Classroom::Host)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Classroom::Title).text().not_null())
                    .col(
                        ColumnDef::new(Classroom::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Classroom::JoinCode).text().not_null())
                    .col(
                        ColumnDef::new(Classroom::CreateAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .col(
                        ColumnDef::new(Classroom::UpdateAt)
                            .date_time()
                            .not_null()
                            .extra(UPDATE_AT.to_string()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-classroom-join_code")
                    .table(Classroom::Table)
                    .col(Classroom::JoinCode)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Enrollment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Enrollment::ClassroomId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollment-classroom")
                            .from(Enrollment::Table, Enrollment::ClassroomId)
                            .to(Classroom::Table, Classroom::Id),
                    )
                    .col(ColumnDef::new(Enrollment::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollment-user")
                            .from(Enrollment::Table, Enrollment::UserId)
                            .to(User::Table, User::Id),
                    )
                    .col(
                        ColumnDef::new(Enrollment::RosterNumber)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Enrollment::CreateAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-enrollment-classroom-user")
                    .table(Enrollment::Table)
                    .col(Enrollment::ClassroomId)
                    .col(Enrollment::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        index!(manager, Enrollment, UserId);
        manager
            .create_table(
                Table::create()
                    .table(Problem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Problem::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Problem::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-problem-user")
                            .from(Problem::Table, Problem::UserId)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Problem::Title).text().not_null())
                    .col(
                        ColumnDef::new(Problem::Content)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Problem::Difficulty)
                            .unsigned()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Problem::Category)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Problem::MatchRule)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Problem::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Problem::CreateAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .col(
                        ColumnDef::new(Problem::UpdateAt)
                            .date_time()
                            .not_null()
                            .extra(UPDATE_AT.to_string()),
                    )
                    .to_owned(),
            )
            .await?;
        index!(manager, Problem, UserId);
        manager
            .create_table(
                Table::create()
                    .table(Testcase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Testcase::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Testcase::ProblemId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-testcase-problem")
                            .from(Testcase::Table, Testcase::ProblemId)
                            .to(Problem::Table, Problem::Id),
                    )
                    .col(ColumnDef::new(Testcase::Input).text().not_null())
                    .col(ColumnDef::new(Testcase::Output).text().not_null())
                    .col(
                        ColumnDef::new(Testcase::Sequence)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;
        index!(manager, Testcase, ProblemId);
        manager
            .create_table(
                Table::create()
                    .table(Assignment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignment::ClassroomId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assignment-classroom")
                            .from(Assignment::Table, Assignment::ClassroomId)
                            .to(Classroom::Table, Classroom::Id),
                    )
                    .col(ColumnDef::new(Assignment::ProblemId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assignment-problem")
                            .from(Assignment::Table, Assignment::ProblemId)
                            .to(Problem::Table, Problem::Id),
                    )
                    .col(
                        ColumnDef::new(Assignment::AiLevel)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Assignment::Gallery)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Assignment::Sequence)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-assignment-classroom-problem")
                    .table(Assignment::Table)
                    .col(Assignment::ClassroomId)
                    .col(Assignment::ProblemId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Submit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submit::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Submit::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-submit-user")
                            .from(Submit::Table, Submit::UserId)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Submit::ProblemId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-submit-problem")
                            .from(Submit::Table, Submit::ProblemId)
                            .to(Problem::Table, Problem::Id),
                    )
                    .col(ColumnDef::new(Submit::ClassroomId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-submit-classroom")
                            .from(Submit::Table, Submit::ClassroomId)
                            .to(Classroom::Table, Classroom::Id),
                    )
                    .col(
                        ColumnDef::new(Submit::UploadAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .col(
                        ColumnDef::new(Submit::Committed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Submit::Code).text().not_null())
                    .col(
                        ColumnDef::new(Submit::PassCase)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Submit::TotalCase)
                            .unsigned()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Submit::Accept)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Submit::Score).unsigned().null())
                    .col(ColumnDef::new(Submit::Grade).text().null())
                    .col(ColumnDef::new(Submit::Feedback).text().null())
                    .to_owned(),
            )
            .await?;
        index!(manager, Submit, ClassroomId);
        index!(manager, Submit, UserId);
        index!(manager, Submit, ProblemId);
        manager
            .create_table(
                Table::create()
                    .table(Chat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chat::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chat::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chat-user")
                            .from(Chat::Table, Chat::UserId)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Chat::ProblemId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chat-problem")
                            .from(Chat::Table, Chat::ProblemId)
                            .to(Problem::Table, Problem::Id),
                    )
                    .col(ColumnDef::new(Chat::ClassroomId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chat-classroom")
                            .from(Chat::Table, Chat::ClassroomId)
                            .to(Classroom::Table, Classroom::Id),
                    )
                    .col(ColumnDef::new(Chat::Role).integer().not_null().default(0))
                    .col(ColumnDef::new(Chat::Payload).text().not_null())
                    .col(
                        ColumnDef::new(Chat::CreateAt)
                            .date_time()
                            .not_null()
                            .extra(CREATE_AT.to_string()),
                    )
                    .to_owned(),
            )
            .await?;
        index!(manager, Chat, ClassroomId);
        index!(manager, Chat, UserId);
        manager
            .create_table(
                Table::create()
                    .table(Token::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Token::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Token::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-token-user")
                            .from(Token::Table, Token::UserId)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Token::Rand).binary().not_null())
                    .col(ColumnDef::new(Token::Role).integer().not_null())
                    .col(ColumnDef::new(Token::Expiry).date_time().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-token-rand")
                    .table(Token::Table)
                    .col(Token::Rand)
                    .unique()
                    .to_owned(),
            )
            .await?;
        index!(manager, Token, UserId);

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Token::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Chat::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Submit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assignment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Testcase::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Problem::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classroom::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        Ok(())
    }
}
