// Auth-retry wrapper: a command that fails because our credential was
// rejected gets one forced re-login and exactly one more attempt.

use crate::context::Context;
use crate::error::{ErrorKind, Result};
use tracing::info;

/// Run `run` once; on a credential failure, force re-authentication and
/// run it a second time, returning whatever that attempt produces.
pub fn invoke<F>(ctx: &mut Context, mut run: F) -> Result<()>
where
    F: FnMut(&mut Context) -> Result<()>,
{
    let err = match run(ctx) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    match err.kind() {
        ErrorKind::ExpiredToken => println!("Access token has expired; please log in again."),
        ErrorKind::Unauthorized => println!("Bad access token; please log in again."),
        ErrorKind::Other => return Err(err),
    }
    info!(error = %err, "credential rejected, re-authenticating");

    ctx.authorize(true)?;
    run(ctx)
}
