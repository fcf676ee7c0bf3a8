use crate::types::UserID;

/// Why a mutation was refused. Both kinds are reported to the caller the same way.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("resource not found")]
    NotFound,
    #[error("caller does not own the resource")]
    Forbidden,
}

/// Only the creator of a resource may mutate it.
pub fn authorize(caller: UserID, owner: UserID) -> Result<(), OwnershipError> {
    if caller != owner {
        return Err(OwnershipError::Forbidden);
    }

    Ok(())
}

/// Combine an owner lookup with the ownership rule.
pub fn authorize_lookup(caller: UserID, owner: Option<UserID>) -> Result<(), OwnershipError> {
    let owner = owner.ok_or(OwnershipError::NotFound)?;
    authorize(caller, owner)
}
