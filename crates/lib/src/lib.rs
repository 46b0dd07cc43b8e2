//! Contact messaging library: SMS text preparation, recipient resolution,
//! bulk actions (mass text, reply, groups, flags) and list filters.

pub mod actions;
pub mod auth;
pub mod config;
pub mod filters;
pub mod model;
pub mod router;
pub mod selection;
pub mod store;
pub mod text;
