//! Identity layer: who the caller is and what they may touch.
//! Keep the public surface thin and split implementation across sub-modules.

mod guard;
mod password;
mod principal;
mod token;

pub use guard::authorize_owner;
pub use password::{hash_password, verify_password};
pub use principal::Principal;
pub use token::{Claims, TokenService};
