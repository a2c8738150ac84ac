//! Simulation engine for the Cubicle office-career game.
//!
//! This crate owns everything that mutates a session: the effects engine,
//! the weekly scheduler and its sub-steps, and the session surface that
//! external callers drive.
//!
//! # Modules
//!
//! - [`catalog`] -- Immutable content tables embedded from YAML.
//! - [`clock`] -- Week-to-calendar mapping.
//! - [`commands`] -- Handlers for typed player commands.
//! - [`config`] -- Configuration loading from `cubicle-config.yaml`.
//! - [`ecology`] -- Weekly NPC relation events and career transitions.
//! - [`effects`] -- Intent effects on the player and project.
//! - [`ending`] -- Game-over evaluation.
//! - [`events`] -- Flavor, quarterly, spawn, and global disruption events.
//! - [`intent`] -- Keyword classifier for free text.
//! - [`journal`] -- Chat log and memory facts.
//! - [`narrator`] -- [`Narrator`] trait and [`HeuristicNarrator`].
//! - [`num`] -- Numeric conversions for effect formulas.
//! - [`org`] -- Org chart queries and relation seeding.
//! - [`project`] -- Project evolution, milestones, and cancellation.
//! - [`promotion`] -- Promotion candidacy and reviews.
//! - [`purchase`] -- Canteen, store, and academy purchases.
//! - [`session`] -- [`Session`], the per-player simulation context.
//! - [`setup`] -- Fresh state and onboarding.
//! - [`tick`] -- The weekly scheduler.
//! - [`turn`] -- Mutable context threaded through one action.
//!
//! [`Narrator`]: narrator::Narrator
//! [`HeuristicNarrator`]: narrator::HeuristicNarrator
//! [`Session`]: session::Session

pub mod catalog;
pub mod clock;
pub mod commands;
pub mod config;
pub mod ecology;
pub mod effects;
pub mod ending;
pub mod events;
pub mod intent;
pub mod journal;
pub mod narrator;
pub mod num;
pub mod org;
pub mod project;
pub mod promotion;
pub mod purchase;
pub mod session;
pub mod setup;
pub mod tick;
pub mod turn;
