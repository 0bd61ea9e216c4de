#![doc = "asset-bucket-core: core logic library for asset-bucket."]

//! This crate contains the bucket synchronisation pipeline: enumerating local
//! buckets, reconciling each one with a remote release, uploading missing files
//! as release assets and persisting a JSON manifest per bucket.
//!
//! The remote provider is only reached through the [`contract::ReleaseStore`]
//! trait; concrete HTTP clients live in the `asset-bucket` crate.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick a [`contract::ReleaseStore`]
//! implementation and call [`synchronise::synchronise`].

pub mod bucket;
pub mod config;
pub mod contract;
pub mod enumerate;
pub mod manifest;
pub mod reconcile;
pub mod sanitize;
pub mod synchronise;
pub mod upload;
