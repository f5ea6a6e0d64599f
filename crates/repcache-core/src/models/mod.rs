//! Data models for portal entities.
//!
//! This module contains the data structures used to represent the
//! coaching-portal data served by the membership backend:
//!
//! - `ClientProfile`: the signed-in client and their contact info
//! - `Membership`: the subscription record whose `active` flag gates access
//! - `Plan`, `Workout`, `Exercise`, `Meal`: training and nutrition plans
//! - `MembershipBundle`: the full payload returned by a membership fetch

pub mod client;
pub mod membership;
pub mod plan;

pub use client::ClientProfile;
pub use membership::{Membership, MembershipBundle};
pub use plan::{Exercise, Meal, MealItem, Plan, Workout};
