//! Access control: one stateless decision function for every protected
//! operation. Services resolve the target (site ids, owner id) from the store
//! and ask [`authorize`]; handlers never branch on roles themselves.

use std::collections::BTreeSet;

use crate::entities::users::Role;

/// The authenticated caller. Built by the auth service from a verified token
/// and the user row; never mutated during a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub authorized_sites: BTreeSet<i32>,
}

impl Principal {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Admins are implicitly authorized for every site.
    #[must_use]
    pub fn can_access_site(&self, site_id: i32) -> bool {
        self.is_admin() || self.authorized_sites.contains(&site_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Site,
    Device,
    Metric,
    Subscription,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub resource: Resource,
    pub verb: Verb,
}

impl Operation {
    #[must_use]
    pub const fn new(resource: Resource, verb: Verb) -> Self {
        Self { resource, verb }
    }

    #[must_use]
    pub const fn read(resource: Resource) -> Self {
        Self::new(resource, Verb::Read)
    }

    #[must_use]
    pub const fn create(resource: Resource) -> Self {
        Self::new(resource, Verb::Create)
    }

    #[must_use]
    pub const fn update(resource: Resource) -> Self {
        Self::new(resource, Verb::Update)
    }

    #[must_use]
    pub const fn delete(resource: Resource) -> Self {
        Self::new(resource, Verb::Delete)
    }

    /// Minimum role regardless of target. `None` means any active principal.
    const fn required_role(self) -> Option<Role> {
        match (self.resource, self.verb) {
            (Resource::Device | Resource::Metric, Verb::Create | Verb::Update | Verb::Delete) => {
                Some(Role::Technician)
            }
            (Resource::Site, Verb::Create | Verb::Update | Verb::Delete) | (Resource::User, _) => {
                Some(Role::Admin)
            }
            _ => None,
        }
    }
}

/// What the operation touches, as resolved by the caller from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No site or owner constraint (listings, admin endpoints).
    Any,
    Site(i32),
    /// An update that may move an entity between sites. `from` is always
    /// checked; `to` only when it differs.
    SiteTransfer { from: i32, to: i32 },
    /// A subscription owned by the given user id.
    OwnedBy(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("Inactive user")]
    InactiveUser,

    #[error("Not enough permissions")]
    InsufficientRole { required: Role },

    #[error("Not authorized to access this site")]
    NotAuthorizedForSite { site_id: i32 },

    #[error("Not authorized to access this subscription")]
    NotSubscriptionOwner,
}

impl Denial {
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InactiveUser => "inactive_user",
            Self::InsufficientRole { .. } => "insufficient_role",
            Self::NotAuthorizedForSite { .. } => "site_scope",
            Self::NotSubscriptionOwner => "not_owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts into a `Result` so services can use `?`.
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(denial) => Err(denial),
        }
    }
}

/// Decides whether `principal` may perform `operation` on `target`.
///
/// Rules apply in order: active flag, role gate, site scoping (admins pass),
/// subscription ownership (admins do not pass).
#[must_use]
pub fn authorize(principal: &Principal, operation: Operation, target: &Target) -> Decision {
    let decision = evaluate(principal, operation, target);

    if let Decision::Deny(denial) = &decision {
        metrics::counter!("access_denials_total", "reason" => denial.reason()).increment(1);
        tracing::debug!(
            user_id = principal.user_id,
            ?operation,
            ?target,
            reason = denial.reason(),
            "Access denied"
        );
    }

    decision
}

/// Shorthand for `authorize(..).into_result()`.
pub fn ensure(principal: &Principal, operation: Operation, target: &Target) -> Result<(), Denial> {
    authorize(principal, operation, target).into_result()
}

fn evaluate(principal: &Principal, operation: Operation, target: &Target) -> Decision {
    if !principal.is_active {
        return Decision::Deny(Denial::InactiveUser);
    }

    if let Some(required) = operation.required_role()
        && !principal.role.at_least(required)
        && !is_self_read(principal, operation, target)
    {
        return Decision::Deny(Denial::InsufficientRole { required });
    }

    match *target {
        Target::Any => Decision::Allow,
        Target::Site(site_id) => site_decision(principal, site_id),
        Target::SiteTransfer { from, to } => match site_decision(principal, from) {
            Decision::Allow if to != from => site_decision(principal, to),
            other => other,
        },
        Target::OwnedBy(owner_id) => {
            if owner_id == principal.user_id {
                Decision::Allow
            } else {
                Decision::Deny(Denial::NotSubscriptionOwner)
            }
        }
    }
}

/// Any active user may read their own account.
fn is_self_read(principal: &Principal, operation: Operation, target: &Target) -> bool {
    operation == Operation::read(Resource::User) && *target == Target::OwnedBy(principal.user_id)
}

fn site_decision(principal: &Principal, site_id: i32) -> Decision {
    if principal.can_access_site(site_id) {
        Decision::Allow
    } else {
        Decision::Deny(Denial::NotAuthorizedForSite { site_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, sites: &[i32]) -> Principal {
        Principal {
            user_id: 1,
            username: "tester".to_string(),
            role,
            is_active: true,
            authorized_sites: sites.iter().copied().collect(),
        }
    }

    const ALL_OPS: [Operation; 20] = {
        use Resource::{Device, Metric, Site, Subscription, User};
        use Verb::{Create, Delete, Read, Update};
        [
            Operation::new(Site, Read),
            Operation::new(Site, Create),
            Operation::new(Site, Update),
            Operation::new(Site, Delete),
            Operation::new(Device, Read),
            Operation::new(Device, Create),
            Operation::new(Device, Update),
            Operation::new(Device, Delete),
            Operation::new(Metric, Read),
            Operation::new(Metric, Create),
            Operation::new(Metric, Update),
            Operation::new(Metric, Delete),
            Operation::new(Subscription, Read),
            Operation::new(Subscription, Create),
            Operation::new(Subscription, Update),
            Operation::new(Subscription, Delete),
            Operation::new(User, Read),
            Operation::new(User, Create),
            Operation::new(User, Update),
            Operation::new(User, Delete),
        ]
    };

    #[test]
    fn test_inactive_user_denied_everything() {
        for role in [Role::Standard, Role::Technician, Role::Admin] {
            let mut p = principal(role, &[1, 2]);
            p.is_active = false;

            for op in ALL_OPS {
                for target in [
                    Target::Any,
                    Target::Site(1),
                    Target::SiteTransfer { from: 1, to: 2 },
                    Target::OwnedBy(1),
                ] {
                    assert_eq!(
                        authorize(&p, op, &target),
                        Decision::Deny(Denial::InactiveUser),
                        "{role:?} {op:?} {target:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_device_mutations_need_technician() {
        let standard = principal(Role::Standard, &[1]);
        for verb in [Verb::Create, Verb::Update, Verb::Delete] {
            assert_eq!(
                authorize(
                    &standard,
                    Operation::new(Resource::Device, verb),
                    &Target::Site(1)
                ),
                Decision::Deny(Denial::InsufficientRole {
                    required: Role::Technician
                })
            );
        }

        let tech = principal(Role::Technician, &[1]);
        assert!(authorize(&tech, Operation::create(Resource::Device), &Target::Site(1)).is_allowed());
        assert!(authorize(&standard, Operation::read(Resource::Device), &Target::Site(1)).is_allowed());
    }

    #[test]
    fn test_role_gate_precedes_site_scope() {
        let standard = principal(Role::Standard, &[]);
        assert_eq!(
            authorize(&standard, Operation::create(Resource::Device), &Target::Site(2)),
            Decision::Deny(Denial::InsufficientRole {
                required: Role::Technician
            })
        );
    }

    #[test]
    fn test_admin_only_operations() {
        let tech = principal(Role::Technician, &[1]);
        for op in [
            Operation::create(Resource::User),
            Operation::update(Resource::User),
            Operation::create(Resource::Site),
            Operation::delete(Resource::Site),
        ] {
            assert_eq!(
                authorize(&tech, op, &Target::Any),
                Decision::Deny(Denial::InsufficientRole {
                    required: Role::Admin
                })
            );
        }

        let admin = principal(Role::Admin, &[]);
        assert!(authorize(&admin, Operation::create(Resource::User), &Target::Any).is_allowed());
    }

    #[test]
    fn test_user_reads_own_account_only() {
        let standard = principal(Role::Standard, &[]);
        assert!(
            authorize(&standard, Operation::read(Resource::User), &Target::OwnedBy(1))
                .is_allowed()
        );
        assert_eq!(
            authorize(&standard, Operation::read(Resource::User), &Target::OwnedBy(2)),
            Decision::Deny(Denial::InsufficientRole {
                required: Role::Admin
            })
        );
        assert_eq!(
            authorize(&standard, Operation::update(Resource::User), &Target::OwnedBy(1)),
            Decision::Deny(Denial::InsufficientRole {
                required: Role::Admin
            })
        );
    }

    #[test]
    fn test_site_scoping() {
        let tech = principal(Role::Technician, &[1]);
        assert!(authorize(&tech, Operation::read(Resource::Device), &Target::Site(1)).is_allowed());
        assert_eq!(
            authorize(&tech, Operation::read(Resource::Device), &Target::Site(2)),
            Decision::Deny(Denial::NotAuthorizedForSite { site_id: 2 })
        );

        let admin = principal(Role::Admin, &[]);
        for site in [1, 2, 99] {
            assert!(
                authorize(&admin, Operation::delete(Resource::Device), &Target::Site(site))
                    .is_allowed()
            );
        }
    }

    #[test]
    fn test_site_transfer_checks_old_site_always() {
        let tech = principal(Role::Technician, &[2]);
        // Moving away from an unauthorized site is denied even when the new
        // site is authorized.
        assert_eq!(
            authorize(
                &tech,
                Operation::update(Resource::Device),
                &Target::SiteTransfer { from: 1, to: 2 }
            ),
            Decision::Deny(Denial::NotAuthorizedForSite { site_id: 1 })
        );
    }

    #[test]
    fn test_site_transfer_checks_new_site_when_different() {
        let tech = principal(Role::Technician, &[1]);
        assert_eq!(
            authorize(
                &tech,
                Operation::update(Resource::Device),
                &Target::SiteTransfer { from: 1, to: 2 }
            ),
            Decision::Deny(Denial::NotAuthorizedForSite { site_id: 2 })
        );
        assert!(
            authorize(
                &tech,
                Operation::update(Resource::Device),
                &Target::SiteTransfer { from: 1, to: 1 }
            )
            .is_allowed()
        );
    }

    #[test]
    fn test_subscription_ownership_has_no_admin_bypass() {
        let owner = principal(Role::Standard, &[]);
        for verb in [Verb::Read, Verb::Update, Verb::Delete] {
            let op = Operation::new(Resource::Subscription, verb);
            assert!(authorize(&owner, op, &Target::OwnedBy(1)).is_allowed());

            let mut admin = principal(Role::Admin, &[1, 2]);
            admin.user_id = 2;
            assert_eq!(
                authorize(&admin, op, &Target::OwnedBy(1)),
                Decision::Deny(Denial::NotSubscriptionOwner)
            );
        }
    }

    #[test]
    fn test_decision_into_result() {
        assert!(Decision::Allow.into_result().is_ok());
        assert_eq!(
            Decision::Deny(Denial::NotSubscriptionOwner).into_result(),
            Err(Denial::NotSubscriptionOwner)
        );
    }
}
