use std::fmt::Display;

use grpc::backend::Role;

use super::error::Error;

/// account privilege level
///
/// `Guest` is the absence of a token and is never stored,
/// stored roles start at [`RoleLv::Student`]
#[derive(Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Debug)]
#[repr(i32)]
pub enum RoleLv {
    Guest = 0,
    Student = 1,
    Teacher = 2,
    Admin = 3,
    Root = 4,
}

impl Display for RoleLv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleLv::Guest => write!(f, "\"Guest\""),
            RoleLv::Student => write!(f, "\"Student\""),
            RoleLv::Teacher => write!(f, "\"Teacher\""),
            RoleLv::Admin => write!(f, "\"Admin\""),
            RoleLv::Root => write!(f, "\"Root\""),
        }
    }
}

impl From<Role> for RoleLv {
    fn from(value: Role) -> Self {
        match value {
            Role::Student => RoleLv::Student,
            Role::Teacher => RoleLv::Teacher,
            Role::Admin => RoleLv::Admin,
            Role::Root => RoleLv::Root,
        }
    }
}

impl From<RoleLv> for Role {
    fn from(value: RoleLv) -> Self {
        match value {
            // guest tokens are never issued
            RoleLv::Guest | RoleLv::Student => Role::Student,
            RoleLv::Teacher => Role::Teacher,
            RoleLv::Admin => Role::Admin,
            RoleLv::Root => Role::Root,
        }
    }
}

impl TryFrom<i32> for RoleLv {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Guest),
            1 => Ok(Self::Student),
            2 => Ok(Self::Teacher),
            3 => Ok(Self::Admin),
            4 => Ok(Self::Root),
            _ => Err(Error::Unreachable("Invalid RoleLv")),
        }
    }
}

impl RoleLv {
    pub fn student(&self) -> bool {
        *self as i32 >= 1
    }
    pub fn teacher(&self) -> bool {
        *self as i32 >= 2
    }
    pub fn admin(&self) -> bool {
        *self as i32 >= 3
    }
    pub fn root(&self) -> bool {
        *self as i32 >= 4
    }
}

#[derive(Debug)]
pub enum Auth {
    Guest,
    User((i32, RoleLv)),
}

impl Auth {
    pub fn is_guest(&self) -> bool {
        matches!(self, Auth::Guest)
    }
    pub fn perm(&self) -> RoleLv {
        match self {
            Auth::User((_, x)) => *x,
            _ => RoleLv::Guest,
        }
    }
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Auth::User((x, _)) => Some(*x),
            _ => None,
        }
    }
    /// id and role of the caller, or `Unauthenticated` for guests
    pub fn assume_login(&self) -> Result<(i32, RoleLv), Error> {
        match self {
            Auth::User(x) => Ok(*x),
            _ => Err(Error::Unauthenticated),
        }
    }
}

impl Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Guest => write!(f, "Guest"),
            Auth::User((id, role)) => write!(f, "User({}, {})", id, role),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_order() {
        assert!(RoleLv::Teacher > RoleLv::Student);
        assert!(RoleLv::Root > RoleLv::Admin);
        assert!(RoleLv::Teacher.teacher());
        assert!(!RoleLv::Student.teacher());
        assert!(RoleLv::Admin.teacher());
    }

    #[test]
    fn role_round_trip() {
        for lv in [RoleLv::Student, RoleLv::Teacher, RoleLv::Admin, RoleLv::Root] {
            assert_eq!(RoleLv::try_from(lv as i32).unwrap(), lv);
            assert_eq!(RoleLv::from(Role::from(lv)), lv);
        }
        assert!(RoleLv::try_from(7).is_err());
    }

    #[test]
    fn guest_auth() {
        let auth = Auth::Guest;
        assert!(auth.is_guest());
        assert!(auth.user_id().is_none());
        assert!(auth.assume_login().is_err());
        assert_eq!(auth.perm(), RoleLv::Guest);
    }
}
