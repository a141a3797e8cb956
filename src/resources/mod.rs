//! Asset loading.
//!
//! Textures are read from the assets directory natively and fetched relative
//! to the page origin on the web. Loading never fails the scene: unreadable
//! files become neutral placeholders.

pub mod texture;
