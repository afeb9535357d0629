/// Business logic on top of the [`Store`]
///
/// # Services
///
/// - [`identity::IdentityService`]: accounts, tokens, password reset
/// - [`groups::GroupService`]: group create/read/update/cascade delete
/// - [`games::GameService`]: game create/read/update/delete
/// - [`membership::MembershipService`]: requests and members of both kinds

pub mod games;
pub mod groups;
pub mod identity;
pub mod membership;

use std::sync::Arc;

use crate::mail::Mailer;
use crate::store::Store;

pub use games::GameService;
pub use groups::GroupService;
pub use identity::{IdentityError, IdentityService, IdentitySettings};
pub use membership::{MembershipError, MembershipService};

/// All services over one store, as handed to the HTTP layer
#[derive(Clone)]
pub struct Services {
    pub identity: IdentityService,
    pub groups: GroupService,
    pub games: GameService,
    pub membership: MembershipService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, settings: IdentitySettings) -> Self {
        Self {
            identity: IdentityService::new(store.clone(), mailer, settings),
            groups: GroupService::new(store.clone()),
            games: GameService::new(store.clone()),
            membership: MembershipService::new(store),
        }
    }
}
