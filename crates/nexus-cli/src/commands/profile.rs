use std::path::PathBuf;

use anyhow::bail;

use nexus_client::profile::ProfileSettings;

use super::Context;
use crate::session_file;

pub fn show(ctx: &Context) -> anyhow::Result<()> {
    let settings = ProfileSettings::open(ctx.api.clone(), ctx.signed_in()?, ctx.notifier())?;
    let user = settings.user();

    println!("{} (@{})", user.display_name, user.username);
    if settings.verified_badge() {
        println!("  ✓ identity verified");
    }
    println!("  avatar: {}", settings.avatar_url());
    if let Some(cover) = settings.cover_url() {
        println!("  cover:  {cover}");
    }
    if !settings.email.is_empty() {
        println!("  email:  {}", settings.email);
    }
    if !settings.bio.is_empty() {
        println!("  bio:    {}", settings.bio);
    }
    Ok(())
}

pub async fn set(
    ctx: &Context,
    username: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    cover: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = ctx.signed_in()?;
    let mut settings = ProfileSettings::open(ctx.api.clone(), session.clone(), ctx.notifier())?;

    if let Some(username) = username {
        settings.username = username;
    }
    if let Some(email) = email {
        settings.email = email;
    }
    if let Some(bio) = bio {
        settings.bio = bio;
    }
    if let Some(path) = cover {
        settings.set_cover_from_file(&path).await?;
    }

    if !settings.is_dirty() {
        println!("Nothing to change");
        return Ok(());
    }

    settings.save().await?;
    let Some(current) = session.current() else {
        bail!("session ended while saving");
    };
    session_file::save(&ctx.session_file, &current)?;
    Ok(())
}
