//! Role-based permission checks and the [`RequiresPermission`] extractor.
//!
//! Handlers declare their authorization requirement in the signature:
//!
//! ```ignore
//! async fn create_collection(
//!     _: RequiresPermission<resource::Collections, operation::CreateAll>,
//!     ...
//! ) -> Result<...> { ... }
//! ```
//!
//! Extraction first authenticates the request (401 when no credentials are
//! present) and then checks the required permission against the user's role
//! (403 when the role does not grant it).

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use std::ops::Deref;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};

/// Marker trait tying a zero-sized resource type to its [`Resource`] value.
pub trait ResourceType: Send + Sync {
    const RESOURCE: Resource;
}

/// Marker trait tying a zero-sized operation type to its [`Operation`] value.
pub trait OperationType: Send + Sync {
    const OPERATION: Operation;
}

macro_rules! resource_markers {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub struct $name;
            impl ResourceType for $name {
                const RESOURCE: Resource = Resource::$variant;
            }
        )*
    };
}

macro_rules! operation_markers {
    ($($name:ident),* $(,)?) => {
        $(
            pub struct $name;
            impl OperationType for $name {
                const OPERATION: Operation = Operation::$name;
            }
        )*
    };
}

pub mod resource {
    use super::ResourceType;
    use crate::types::Resource;

    resource_markers! {
        Collections => Collections,
        Products => Products,
        Customers => Customers,
        Orders => Orders,
        Reviews => Reviews,
        Users => Users,
        Jobs => Jobs,
    }
}

pub mod operation {
    use super::OperationType;
    use crate::types::Operation;

    operation_markers! {
        CreateAll,
        CreateOwn,
        ReadAll,
        ReadOwn,
        UpdateAll,
        UpdateOwn,
        DeleteAll,
        DeleteOwn,
    }
}

/// Permissions granted to every authenticated user, staff or not.
///
/// Regular users operate on their own customer profile, orders, and reviews.
fn own_resource_permissions(resource: Resource, operation: Operation) -> bool {
    matches!(
        (resource, operation),
        (Resource::Customers, Operation::ReadOwn)
            | (Resource::Customers, Operation::UpdateOwn)
            | (Resource::Orders, Operation::CreateOwn)
            | (Resource::Orders, Operation::ReadOwn)
            | (Resource::Reviews, Operation::CreateOwn)
    )
}

/// Check whether the user's role grants `operation` over `resource`.
///
/// Staff users hold every permission. A *-All permission implies the
/// corresponding *-Own permission.
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    if user.is_staff {
        return true;
    }
    own_resource_permissions(resource, operation)
}

/// True when the user may read every instance of `resource`, not just their own.
pub fn can_read_all_resources(user: &CurrentUser, resource: Resource) -> bool {
    has_permission(user, resource, Operation::ReadAll)
}

/// Authenticated user that has been checked against a required permission.
///
/// Dereferences to [`CurrentUser`] so handlers can use it as the acting user.
pub struct RequiresPermission<R: ResourceType, O: OperationType> {
    pub user: CurrentUser,
    _marker: PhantomData<(R, O)>,
}

impl<R: ResourceType, O: OperationType> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<R: ResourceType, O: OperationType> FromRequestParts<AppState> for RequiresPermission<R, O> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !has_permission(&user, R::RESOURCE, O::OPERATION) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: R::RESOURCE.to_string(),
            });
        }

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn staff_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "staff".to_string(),
            email: "staff@example.com".to_string(),
            is_staff: true,
        }
    }

    fn regular_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "user".to_string(),
            email: "user@example.com".to_string(),
            is_staff: false,
        }
    }

    #[test]
    fn staff_holds_all_permissions() {
        let user = staff_user();
        assert!(has_permission(&user, Resource::Collections, Operation::DeleteAll));
        assert!(has_permission(&user, Resource::Orders, Operation::ReadAll));
        assert!(has_permission(&user, Resource::Jobs, Operation::CreateAll));
    }

    #[test]
    fn regular_user_cannot_manage_catalog() {
        let user = regular_user();
        assert!(!has_permission(&user, Resource::Collections, Operation::CreateAll));
        assert!(!has_permission(&user, Resource::Products, Operation::UpdateAll));
        assert!(!has_permission(&user, Resource::Jobs, Operation::ReadAll));
    }

    #[test]
    fn regular_user_owns_their_orders_and_profile() {
        let user = regular_user();
        assert!(has_permission(&user, Resource::Orders, Operation::CreateOwn));
        assert!(has_permission(&user, Resource::Orders, Operation::ReadOwn));
        assert!(has_permission(&user, Resource::Customers, Operation::ReadOwn));
        assert!(has_permission(&user, Resource::Customers, Operation::UpdateOwn));
        assert!(has_permission(&user, Resource::Reviews, Operation::CreateOwn));
        assert!(!has_permission(&user, Resource::Orders, Operation::ReadAll));
    }

    #[test]
    fn read_all_check_matches_role() {
        assert!(can_read_all_resources(&staff_user(), Resource::Orders));
        assert!(!can_read_all_resources(&regular_user(), Resource::Orders));
    }
}
