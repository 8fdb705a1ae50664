// Library root
// -----------
// This crate exposes the library surface behind the `pk` binary.
//
// Module responsibilities:
// - `api`: HTTP calls to the platform's key and project endpoints.
// - `auth`: OAuth tokens, their storage on disk and interactive login.
// - `commands`: the command registry, dispatcher and auth-retry wrapper,
//   plus one module per group of commands.
// - `config`: settings read from the environment.
// - `context`: the collaborators a command runs against.
// - `error`: the error enum every layer returns.
// - `keys`: local SSH key discovery and upload selection.
// - `ui`: terminal prompts and menu input validation.
pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod ui;

pub use error::{Error, ErrorKind, Result};
