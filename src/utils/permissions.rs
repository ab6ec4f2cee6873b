use crate::{
    db::{UserAuth, UserId},
    error::{AppError, AppResult},
};

/// Writes to tags and ingredients are reserved for admins.
pub fn require_admin(user: &UserAuth) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

/// Only the owner of the object or an admin may touch it.
pub fn owner_or_admin(user: &UserAuth, owner_id: UserId) -> AppResult<()> {
    if user.is_admin() || user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the author can change this recipe"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;

    fn user(id: UserId, role: Role) -> UserAuth {
        UserAuth {
            id,
            email: format!("{id}@example.com"),
            username: format!("user{id}"),
            first_name: String::new(),
            last_name: String::new(),
            hash: String::new(),
            role,
        }
    }

    #[test]
    fn writes_need_an_admin() {
        assert!(matches!(
            require_admin(&user(1, Role::User)),
            Err(AppError::Forbidden(_))
        ));
        assert!(require_admin(&user(1, Role::Admin)).is_ok());
    }

    #[test]
    fn owner_or_admin_rules() {
        assert!(owner_or_admin(&user(1, Role::User), 1).is_ok());
        assert!(owner_or_admin(&user(2, Role::Admin), 1).is_ok());
        assert!(owner_or_admin(&user(2, Role::User), 1).is_err());
    }
}
