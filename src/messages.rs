//! Reply texts posted back to the chat. `<t:SECONDS>` is the chat client's
//! timestamp marker and renders in each reader's local time.

use crate::commands::CommandKind;
use crate::db::Poll;
use crate::error::PollError;
use crate::polls::{Tally, VoteReceipt};

pub fn usage(kind: CommandKind, prefix: &str) -> String {
    let args = match kind {
        CommandKind::Start => {
            "-q/--question <question text> -d/--duration <duration, e.g. 5m or 1h30m> -n/--name <poll name> -o/--options <space separated options>"
        }
        CommandKind::Stop => "-n/--name <poll name> -i/--id <poll id, optional>",
        CommandKind::Vote => {
            "-n/--name <poll name> -o/--option <option number or text> -i/--id <poll id, optional>"
        }
        CommandKind::List => "-n/--name <poll name, optional> -i/--id <poll id, optional>",
        CommandKind::Help => "<command, optional>",
    };
    format!("`{prefix}{} {args}`", kind.name())
}

pub fn usage_error(kind: CommandKind, prefix: &str) -> String {
    format!(
        "Use the command:\n{}\nFor more info run the command `{prefix}qphelp {}`",
        usage(kind, prefix),
        kind.name()
    )
}

pub fn help(topic: Option<CommandKind>, prefix: &str) -> String {
    match topic {
        Some(kind) => format!("{}\n{}", describe(kind), usage(kind, prefix)),
        None => {
            let mut lines = vec!["Quick poll commands:".to_string()];
            for kind in CommandKind::ALL {
                lines.push(format!("{} - {}", usage(kind, prefix), describe(kind)));
            }
            lines.join("\n")
        }
    }
}

fn describe(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Start => "Start a timed poll. Duration defaults to 5 minutes.",
        CommandKind::Stop => "End your poll early and post the results.",
        CommandKind::Vote => "Vote once on an active poll, by option number or text.",
        CommandKind::List => "Show active polls.",
        CommandKind::Help => "Show this help.",
    }
}

fn numbered_options(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(idx, option)| format!("{}. {}", idx + 1, option))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn started(poll: &Poll, prefix: &str) -> String {
    format!(
        "Poll `{name}` started!\nQuestion: {question}\n\nOptions:\n{options}\n\n\
         Vote using the command `{prefix}qpvote -n {name} -o 1-{count}` or `{prefix}qpvote -n {name} -o <option>`\n\
         Poll will close at <t:{ended_at}>",
        name = poll.name,
        question = poll.question,
        options = numbered_options(&poll.options),
        count = poll.options.len(),
        ended_at = poll.ended_at,
    )
}

pub fn already_running(name: &str, live: &[Poll], prefix: &str) -> String {
    if live.is_empty() {
        return format!(
            "Poll `{name}` had expired and is now closed. Run `{prefix}qpstart` again to start a new one."
        );
    }
    format!(
        "Poll with the name {name} already exists. Vote on that poll using the command:\n{}",
        usage(CommandKind::Vote, prefix)
    )
}

pub fn vote_accepted(mention: &str, receipt: &VoteReceipt) -> String {
    format!(
        "Thank you for voting {mention}\nStay tuned, the results will be announced at <t:{}>",
        receipt.poll.ended_at
    )
}

pub fn results(tally: &Tally) -> String {
    format!(
        "Poll `{}` has ended!\nQuestion: {}\n\nResults:\n{}",
        tally.poll.name,
        tally.poll.question,
        tally.render(tally.poll.column_width())
    )
}

pub fn no_active_polls(prefix: &str) -> String {
    format!(
        "No active polls, start one using the command:\n{}",
        usage(CommandKind::Start, prefix)
    )
}

pub fn poll_list(polls: &[Poll], prefix: &str) -> String {
    if polls.is_empty() {
        return no_active_polls(prefix);
    }

    let separator = format!("\n{}\n", "=".repeat(30));
    let mut sections = vec!["Available polls:".to_string()];
    sections.extend(polls.iter().map(|poll| {
        format!(
            "Poll: {name} (id {id})\nQuestion: {question}\n\nOptions:\n{options}\n\n\
             Vote using the command `{prefix}qpvote -n {name} -o <option>`\n\
             Poll will close at <t:{ended_at}>",
            name = poll.name,
            id = poll.id,
            question = poll.question,
            options = numbered_options(&poll.options),
            ended_at = poll.ended_at,
        )
    }));
    sections.join(&separator)
}

/// Turns a failed command into the reply the requester sees.
pub fn error_reply(error: &PollError, kind: CommandKind, mention: &str, prefix: &str) -> String {
    match error {
        PollError::Validation(reason) => {
            format!("{reason}.\n{}", usage_error(kind, prefix))
        }
        PollError::DuplicateVote => format!(
            "{mention}, can't vote more than once. Please wait until the poll ends, or create a new poll using the command:\n{}",
            usage(CommandKind::Start, prefix)
        ),
        PollError::InvalidOption { choice, allowed } => format!(
            "{choice} is not in [{}], choose one of the options in the poll.",
            allowed.join(", ")
        ),
        PollError::PermissionDenied => format!(
            "{mention} Permission denied. You are not the creator of the poll, wait until the poll ends."
        ),
        PollError::NoActivePoll | PollError::PollNotFound => no_active_polls(prefix),
        PollError::Timeout => "The poll store is busy, please try again in a moment.".to_string(),
        PollError::Store(_) | PollError::Task(_) => {
            "Something went wrong, please try again later.".to_string()
        }
    }
}
