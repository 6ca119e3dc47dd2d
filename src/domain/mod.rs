//! Domain types shared by configuration and the embedding engine.

pub mod options;
