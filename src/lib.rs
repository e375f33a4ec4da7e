//! Core library for the workplan tracker command line application.
//!
//! The tracker turns a hierarchical workplan spreadsheet into a flat task list,
//! splits every task across the regions it is delivered in, and keeps
//! per-task status, progress and comments in a tracker workbook with rotating
//! backups. IO adapters live under [`workplan::tracker::io`], the task
//! representation inside [`workplan::tracker::model`], the one-off workplan
//! extraction in [`workplan::tracker::extract`], persistence in
//! [`workplan::tracker::store`] and edit reconciliation in
//! [`workplan::tracker::reconcile`].

pub mod workplan;

pub use workplan::tracker::{
    Result, TrackerError, actions, config, error, extract, filter, io, migrate, model, reconcile,
    session, store, summary, update,
};
