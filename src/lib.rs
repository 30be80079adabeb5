//! Swim-meet announcement parsing and catalog reconciliation.
//!
//! Text side: [`splitter`], [`classifier`], [`event`], [`pool`] and
//! [`parser`] turn an announcement into [`meet_types::SessionDescriptor`]s.
//! Matching side: [`normalize`], [`subtract`], [`fuzzy`] and [`city`].
//! [`resolver`] and [`batch`] reconcile parsed data with a [`catalog`].

pub mod batch;
pub mod catalog;
pub mod city;
pub mod classifier;
pub mod config;
pub mod error;
pub mod event;
pub mod fuzzy;
pub mod normalize;
pub mod parser;
pub mod pool;
pub mod resolver;
pub mod scanner;
pub mod splitter;
pub mod subtract;
pub mod summary;
