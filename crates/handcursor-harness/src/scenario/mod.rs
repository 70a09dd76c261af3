//! Scenario-based testing of the interaction pipeline.
//!
//! A scenario scripts sensor events against a fresh engine and must end in
//! an oracle: a function that inspects the final [`World`] and says whether
//! the run was correct. Oracles may also be checked mid-script.
//!
//! # Example
//!
//! ```ignore
//! Scenario::new("push click")
//!     .config(responsive_config())
//!     .connect()
//!     .frames(|sensor| {
//!         sensor.add_hand(1, Chirality::Right, Vector2::new(960.0, 540.0), 0.20);
//!         sensor.push(1, 0.0, 20)
//!     })
//!     .oracle(oracle::count(InputType::Down, 1))
//!     .run()
//! ```

mod builder;
pub mod oracle;
mod world;

use handcursor_core::{ConfigBundle, config::SmoothingSettings};

pub use builder::{RunnableScenario, Scenario};
pub use world::World;

/// Verification run against the world.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

/// Default configuration with smoothing loose enough that scripted
/// positions are reached within a couple of frames.
pub fn responsive_config() -> ConfigBundle {
    let mut bundle = ConfigBundle::default();
    bundle.interaction.smoothing = SmoothingSettings { min_cutoff: 1000.0, ..Default::default() };
    bundle
}
