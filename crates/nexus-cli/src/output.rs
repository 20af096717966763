use std::io::{self, BufRead, Write};

use nexus_client::notify::{Notification, Notifier};
use nexus_client::thread_view::{Confirm, MessageView, ThreadLayout};
use nexus_types::content::{AttachmentKind, Segment};

/// Prints notifications to stderr as they arrive.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        let mark = if notification.is_error() { "!" } else { "*" };
        eprintln!("{mark} {}: {}", notification.title, notification.description);
    }
}

/// y/N prompt on the terminal. `assume_yes` skips the question.
pub struct TerminalConfirm {
    pub assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N]: ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn print_layout(layout: &ThreadLayout) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write_layout(&mut out, layout)?;
    out.flush()
}

pub fn write_layout(out: &mut impl Write, layout: &ThreadLayout) -> io::Result<()> {
    if let Some(thread) = &layout.thread {
        match thread.tag() {
            Some(tag) => writeln!(out, "#{} [{}] {}", thread.id, tag, thread.title)?,
            None => writeln!(out, "#{} {}", thread.id, thread.title)?,
        }
    }

    let Some(first) = &layout.originating else {
        return writeln!(out, "(no messages)");
    };
    write_message(out, first, "")?;

    match layout.replies.len() {
        0 => {}
        1 => writeln!(out, "  1 reply")?,
        n => writeln!(out, "  {n} replies")?,
    }
    for reply in &layout.replies {
        write_message(out, reply, "    ")?;
    }
    Ok(())
}

fn write_message(out: &mut impl Write, view: &MessageView, indent: &str) -> io::Result<()> {
    let message = &view.message;
    let mut header = format!(
        "{indent}[{}] {} · {}",
        message.id,
        message.author_name(),
        view.posted
    );
    if message.is_edited {
        header.push_str(" (edited)");
    }
    if message.likes > 0 {
        header.push_str(&format!(" ♥ {}", message.likes));
    }
    if view.permissions.is_own {
        header.push_str(" (you)");
    }
    writeln!(out, "{header}")?;

    let mut line = String::new();
    for segment in &view.segments {
        match segment {
            Segment::Text(text) => {
                let mut parts = text.split('\n').peekable();
                while let Some(part) = parts.next() {
                    line.push_str(part);
                    if parts.peek().is_some() {
                        writeln!(out, "{indent}  {line}")?;
                        line.clear();
                    }
                }
            }
            Segment::LineBreak => {
                writeln!(out, "{indent}  {line}")?;
                line.clear();
            }
            Segment::Attachment(url) => {
                if !line.is_empty() {
                    writeln!(out, "{indent}  {line}")?;
                    line.clear();
                }
                let kind = match AttachmentKind::from_url(url) {
                    AttachmentKind::Image => "image",
                    AttachmentKind::Video => "video",
                    AttachmentKind::Audio => "audio",
                    AttachmentKind::Document => "document",
                    AttachmentKind::Other => "file",
                };
                writeln!(out, "{indent}  <{kind}: {url}>")?;
            }
        }
    }
    if !line.is_empty() {
        writeln!(out, "{indent}  {line}")?;
    }
    Ok(())
}
