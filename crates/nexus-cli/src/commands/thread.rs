use std::path::PathBuf;
use std::sync::Arc;

use nexus_client::HttpForumApi;
use nexus_client::session::SessionHandle;
use nexus_client::thread_view::ThreadView;

use super::Context;
use crate::output::{TerminalConfirm, print_layout};

async fn open(
    ctx: &Context,
    session: SessionHandle,
    thread_id: i64,
    assume_yes: bool,
) -> anyhow::Result<ThreadView<HttpForumApi>> {
    let confirm = Arc::new(TerminalConfirm { assume_yes });
    let view = ThreadView::open(ctx.api.clone(), session, ctx.notifier(), confirm, thread_id).await?;
    Ok(view)
}

pub async fn show(ctx: &Context, thread_id: i64) -> anyhow::Result<()> {
    let view = open(ctx, ctx.session()?, thread_id, false).await?;
    print_layout(&view.layout())?;
    Ok(())
}

pub async fn post(
    ctx: &Context,
    thread_id: i64,
    text: String,
    attach: Option<PathBuf>,
    emoji: Vec<String>,
) -> anyhow::Result<()> {
    let mut view = open(ctx, ctx.signed_in()?, thread_id, false).await?;

    view.set_input(text);
    for e in &emoji {
        view.insert_emoji(e);
    }
    if let Some(path) = attach {
        view.upload_attachment(&path).await?;
    }

    let message = view.send().await?;
    println!("Posted message {}", message.id);
    print_layout(&view.layout())?;
    Ok(())
}

pub async fn edit(ctx: &Context, thread_id: i64, message_id: i64, text: String) -> anyhow::Result<()> {
    let mut view = open(ctx, ctx.signed_in()?, thread_id, false).await?;

    view.begin_edit(message_id)?;
    view.set_edit_buffer(text);
    view.save_edit().await?;
    println!("Updated message {message_id}");
    Ok(())
}

pub async fn delete(ctx: &Context, thread_id: i64, message_id: i64, yes: bool) -> anyhow::Result<()> {
    let mut view = open(ctx, ctx.signed_in()?, thread_id, yes).await?;

    if view.delete(message_id).await? {
        println!("Deleted message {message_id}");
    } else {
        println!("Cancelled");
    }
    Ok(())
}

pub async fn like(ctx: &Context, thread_id: i64, message_id: i64) -> anyhow::Result<()> {
    let mut view = open(ctx, ctx.signed_in()?, thread_id, false).await?;

    view.like(message_id).await?;
    let likes = view
        .messages()
        .iter()
        .find(|m| m.id == message_id)
        .map(|m| m.likes)
        .unwrap_or_default();
    println!("Message {message_id} now has {likes} likes");
    Ok(())
}
