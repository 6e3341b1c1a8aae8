//! # FerroCMS Events
//!
//! The activity emitter: a fan-out hook that receives a structured record
//! on every successful content, page, and block mutation (§2, §6).

pub mod activity;
pub mod bus;
pub mod subscriber;

pub use activity::{Activity, ActivityVerb, ObjectType};
pub use bus::{ActivityEmitter, ActivityEmitterBuilder, ActivityEmitterConfig};
pub use subscriber::{ActivityHandler, Subscriber, SubscriberConfig};
