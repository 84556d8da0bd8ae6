//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID / pool slot)
//! - No rendering or platform dependencies

pub mod boss;
pub mod collision;
pub mod enemy;
pub mod events;
pub mod grid;
pub mod pool;
pub mod projectile;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use boss::{Boss, BossDescriptor, BossPhase, BossState, WeakPoint};
pub use collision::{CollisionResolver, CollisionStats, check_circle_collision};
pub use enemy::{Enemy, FireControl, Formation, MovementPattern, WaveDescriptor};
pub use events::CombatEvent;
pub use grid::SpatialGrid;
pub use pool::Pool;
pub use projectile::{OwnerSide, Projectile, ProjectileDescriptor, ProjectileSystem};
pub use snapshot::RenderSnapshot;
pub use state::{CombatState, Player, PowerUp, PowerUpKind, TickInput};
pub use tick::tick;
