use anyhow::bail;
use tracing::info;

use nexus_client::ForumApi;
use nexus_client::error::ClientError;
use nexus_client::registration::{RegisterForm, RegistrationFlow};
use nexus_client::session::SessionHandle;
use nexus_client::verification::{IdentityFields, IdentityVerifier};
use nexus_identity::checksum;
use nexus_identity::kps::{IdentityQuery, KpsVerifier};
use nexus_types::api::LoginRequest;

use super::Context;
use crate::IdentityArgs;
use crate::session_file;

impl From<IdentityArgs> for IdentityFields {
    fn from(args: IdentityArgs) -> Self {
        Self {
            tc_no: args.tc_no,
            first_name: args.first_name,
            last_name: args.last_name,
            year_of_birth: args.year_of_birth,
        }
    }
}

pub async fn verify(ctx: &Context, identity: IdentityArgs) -> anyhow::Result<()> {
    let verifier = IdentityVerifier::new(ctx.api.clone(), ctx.notifier())
        .with_precheck(ctx.config.tc_precheck);

    if !verifier.verify(&identity.into()).await {
        bail!("identity not verified");
    }
    Ok(())
}

pub async fn register(
    ctx: &Context,
    username: String,
    display_name: String,
    identity: IdentityArgs,
    password: String,
) -> anyhow::Result<()> {
    let mut flow = RegistrationFlow::new(ctx.api.clone(), ctx.notifier(), SessionHandle::new())
        .with_precheck(ctx.config.tc_precheck);
    flow.form = RegisterForm {
        username,
        display_name,
        identity: identity.into(),
        confirm_password: password.clone(),
        password,
    };

    // Report form problems before spending a verification request.
    let errors = flow.form.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {}: {}", error.field, error.message);
        }
        bail!("registration form is invalid");
    }

    if !flow.verify_identity().await {
        bail!("identity not verified");
    }

    let session = match flow.submit().await {
        Ok(session) => session,
        Err(ClientError::Validation(errors)) => {
            for error in &errors {
                eprintln!("  {}: {}", error.field, error.message);
            }
            bail!("registration form is invalid");
        }
        Err(e) => return Err(e.into()),
    };

    session_file::save(&ctx.session_file, &session)?;
    println!("Registered and signed in as {}", session.user.username);
    Ok(())
}

pub async fn login(ctx: &Context, username: String, password: String) -> anyhow::Result<()> {
    let auth = ctx
        .api
        .login(&LoginRequest { username, password })
        .await?;
    let session = SessionHandle::new().begin(auth);
    session_file::save(&ctx.session_file, &session)?;
    println!("Signed in as {}", session.user.username);
    Ok(())
}

pub fn logout(ctx: &Context) -> anyhow::Result<()> {
    if session_file::clear(&ctx.session_file)? {
        info!("Session removed");
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub fn whoami(ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.signed_in()?;
    let Some(current) = session.current() else {
        bail!("Not signed in");
    };

    let user = &current.user;
    println!("{} (@{}) id={}", user.display_name, user.username, user.id);
    if user.is_identity_verified() {
        println!("identity verified");
    }
    if let Some(expires_at) = current.expires_at {
        println!("session expires {}", expires_at.to_rfc3339());
    }
    Ok(())
}

/// Query the government registry the way the forum server does.
pub async fn kps_check(identity: IdentityArgs, offline: bool) -> anyhow::Result<()> {
    if offline {
        if !checksum::is_valid(&identity.tc_no) {
            bail!("national ID checksum failed");
        }
        println!("checksum ok");
        return Ok(());
    }

    let verifier = KpsVerifier::new()?;
    let outcome = verifier
        .verify(&IdentityQuery {
            tc_no: &identity.tc_no,
            first_name: &identity.first_name,
            last_name: &identity.last_name,
            year_of_birth: &identity.year_of_birth,
        })
        .await?;

    println!("{}", outcome.message);
    if !outcome.success {
        bail!("registry did not confirm the identity");
    }
    Ok(())
}
