//! The action resolver: attack rolls, saves, damage and secondary effects.
//!
//! Everything here mutates an [`Arena`](crate::arena::Arena) through a
//! [`TurnContext`](crate::turn::TurnContext), rolling dice from the context's
//! random source and narrating through its sink.
//!
//! # Flow of one action
//!
//! 1. Spend the action (ammo, per-turn use, recharge)
//! 2. Roll to hit, unless the action has no attack bonus
//! 3. On a natural 1, roll for a fumble
//! 4. On a hit, roll every damage term (dice doubled on a critical), each
//!    scaled by its save, plus on-hit passive bonuses
//! 5. Mitigate and subtract; consult avoid-death passives; bury the dead
//! 6. If the target survived, apply failed-save conditions and on-hit
//!    effects in declaration order
//!
//! # Available Functions
//!
//! - [`resolve_action`]: the whole flow above
//! - [`attack_roll`]: step 2 alone
//! - [`saving_throw`]: one save
//! - [`apply_damage`]: step 5 alone
//! - [`kill`]: death bookkeeping

mod attack;
mod damage;
mod effects;
mod save;

pub use attack::{attack_roll, resolve_action, AttackOutcome, HitRoll};
pub use damage::{apply_damage, kill, DamagePart, DamageReport};
pub use save::{saving_throw, SaveOutcome};

pub(crate) use effects::digest;
