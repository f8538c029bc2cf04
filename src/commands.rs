//! Chat command parsing and dispatch.
//!
//! A message such as `!qpvote -n lunch -o 2` is split into shell-like
//! tokens, parsed with clap and run against the [`PollEngine`]. Every
//! outcome, including failures, becomes a single reply text.

use crate::error::PollError;
use crate::messages;
use crate::polls::{PollEngine, StartOutcome, StartRequest, StopRequest, VoteRequest, countdown};
use crate::sse::{self, Announcement, EventSender, PollEvent};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Stop,
    Vote,
    List,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::Start,
        CommandKind::Stop,
        CommandKind::Vote,
        CommandKind::List,
        CommandKind::Help,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Start => "qpstart",
            CommandKind::Stop => "qpstop",
            CommandKind::Vote => "qpvote",
            CommandKind::List => "qplist",
            CommandKind::Help => "qphelp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Parser)]
#[command(name = "qpstart", no_binary_name = true)]
pub struct StartArgs {
    #[arg(short, long, num_args = 1.., required = true)]
    pub question: Vec<String>,
    #[arg(short, long, num_args = 0..)]
    pub duration: Vec<String>,
    #[arg(short, long, num_args = 1.., required = true)]
    pub name: Vec<String>,
    #[arg(short, long, visible_alias = "option", num_args = 1.., required = true)]
    pub options: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "qpstop", no_binary_name = true)]
pub struct StopArgs {
    #[arg(short, long, num_args = 1.., required = true)]
    pub name: Vec<String>,
    #[arg(short, long)]
    pub id: Option<i64>,
}

#[derive(Debug, Parser)]
#[command(name = "qpvote", no_binary_name = true)]
pub struct VoteArgs {
    #[arg(short, long, num_args = 1.., required = true)]
    pub name: Vec<String>,
    #[arg(short, long, num_args = 1.., required = true)]
    pub option: Vec<String>,
    #[arg(short, long)]
    pub id: Option<i64>,
}

#[derive(Debug, Parser)]
#[command(name = "qplist", no_binary_name = true)]
pub struct ListArgs {
    #[arg(short, long, num_args = 1..)]
    pub name: Vec<String>,
    #[arg(short, long)]
    pub id: Option<i64>,
    /// Bare words are read as the poll name.
    pub words: Vec<String>,
}

#[derive(Debug)]
pub enum Command {
    Start(StartArgs),
    Stop(StopArgs),
    Vote(VoteArgs),
    List(ListArgs),
    Help(Option<CommandKind>),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Start(_) => CommandKind::Start,
            Command::Stop(_) => CommandKind::Stop,
            Command::Vote(_) => CommandKind::Vote,
            Command::List(_) => CommandKind::List,
            Command::Help(_) => CommandKind::Help,
        }
    }
}

#[derive(Debug)]
pub struct ParseFailure {
    pub kind: CommandKind,
    pub reason: String,
}

/// Splits on whitespace, keeping single- or double-quoted runs together.
pub fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), '\\') => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape".into()),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".into());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses a chat message. Returns `None` when the message is not addressed
/// to this bot.
pub fn parse(content: &str, prefix: &str) -> Option<Result<Command, ParseFailure>> {
    let body = content.trim().strip_prefix(prefix)?;
    let (head, rest) = body
        .split_once(char::is_whitespace)
        .unwrap_or((body, ""));
    let kind = CommandKind::from_name(head)?;

    let fail = |reason: String| ParseFailure { kind, reason };
    let tokens = match tokenize(rest) {
        Ok(tokens) => tokens,
        Err(reason) => return Some(Err(fail(reason))),
    };

    let parsed = match kind {
        CommandKind::Start => StartArgs::try_parse_from(&tokens).map(Command::Start),
        CommandKind::Stop => StopArgs::try_parse_from(&tokens).map(Command::Stop),
        CommandKind::Vote => VoteArgs::try_parse_from(&tokens).map(Command::Vote),
        CommandKind::List => ListArgs::try_parse_from(&tokens).map(Command::List),
        CommandKind::Help => Ok(Command::Help(
            tokens
                .first()
                .and_then(|t| CommandKind::from_name(t.strip_prefix(prefix).unwrap_or(t))),
        )),
    };

    Some(parsed.map_err(|e| fail(e.kind().to_string())))
}

/// Who sent a command. `mention` is how the reply addresses them.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: String,
    pub mention: String,
}

/// Runs chat commands. Each call is independent: a failing or slow command
/// only affects its own reply.
#[derive(Clone)]
pub struct Dispatcher {
    engine: PollEngine,
    events: EventSender,
    prefix: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(engine: PollEngine, events: EventSender, prefix: String, timeout: Duration) -> Self {
        Self {
            engine,
            events,
            prefix,
            timeout,
        }
    }

    /// Handles one message and returns the reply, or `None` when the message
    /// is not a poll command.
    pub async fn handle(&self, author: &Author, content: &str) -> Option<String> {
        let command = match parse(content, &self.prefix)? {
            Ok(command) => command,
            Err(failure) => {
                info!("{} parse error: {}", failure.kind.name(), failure.reason);
                return Some(messages::usage_error(failure.kind, &self.prefix));
            }
        };

        let kind = command.kind();
        info!("{} from {}: {:?}", kind.name(), author.id, command);

        // The command runs on its own task so a timeout only drops the reply;
        // a poll created late still gets its countdown.
        let worker = self.clone();
        let requester = author.clone();
        let task = tokio::spawn(async move { worker.execute(command, &requester).await });

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PollError::Task(e.to_string())),
            Err(_) => Err(PollError::Timeout),
        };

        Some(match outcome {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    PollError::Store(_) | PollError::Timeout | PollError::Task(_) => {
                        error!("{} failed for {}: {}", kind.name(), author.id, e)
                    }
                    _ => warn!("{} rejected for {}: {}", kind.name(), author.id, e),
                }
                messages::error_reply(&e, kind, &author.mention, &self.prefix)
            }
        })
    }

    async fn execute(&self, command: Command, author: &Author) -> Result<String, PollError> {
        match command {
            Command::Start(args) => {
                let name = args.name.join(" ");
                let outcome = self
                    .engine
                    .start(StartRequest {
                        name: name.clone(),
                        question: args.question.join(" "),
                        options: args.options,
                        creator_id: author.id.clone(),
                        duration: args.duration.first().cloned(),
                    })
                    .await?;

                match outcome {
                    StartOutcome::Created(poll) => {
                        let text = messages::started(&poll, &self.prefix);
                        sse::publish(
                            &self.events,
                            PollEvent::PollStarted(Announcement {
                                poll_id: poll.id,
                                poll_name: poll.name.clone(),
                                text: text.clone(),
                            }),
                        );
                        countdown::schedule(self.engine.clone(), poll, self.events.clone());
                        Ok(text)
                    }
                    StartOutcome::AlreadyActive { live, .. } => {
                        Ok(messages::already_running(&name, &live, &self.prefix))
                    }
                }
            }
            Command::Stop(args) => {
                let outcome = self
                    .engine
                    .stop(StopRequest {
                        name: args.name.join(" "),
                        requester_id: author.id.clone(),
                        poll_id: args.id,
                    })
                    .await?;
                Ok(messages::results(&outcome.tally))
            }
            Command::Vote(args) => {
                let receipt = self
                    .engine
                    .vote(VoteRequest {
                        name: args.name.join(" "),
                        choice: args.option.join(" "),
                        voter_id: author.id.clone(),
                        poll_id: args.id,
                    })
                    .await?;
                Ok(messages::vote_accepted(&author.mention, &receipt))
            }
            Command::List(args) => {
                let words = if args.name.is_empty() { args.words } else { args.name };
                let name = (!words.is_empty()).then(|| words.join(" "));
                let polls = self.engine.list(name.as_deref(), args.id).await?;
                Ok(messages::poll_list(&polls, &self.prefix))
            }
            Command::Help(topic) => Ok(messages::help(topic, &self.prefix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::test_support::*;
    use crate::sse::create_event_broadcaster;

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"-q "Which one?" -o 'ice cream' cake"#).unwrap(),
            vec!["-q", "Which one?", "-o", "ice cream", "cake"]
        );
        assert_eq!(tokenize(r#"-o "" x"#).unwrap(), vec!["-o", "", "x"]);
        assert!(tokenize("-q \"open").is_err());
    }

    #[test]
    fn test_parse_start() {
        let Some(Ok(Command::Start(args))) = parse(
            "!qpstart -q Where do we eat -d 1h -n team lunch -o pizza tacos",
            "!",
        ) else {
            panic!("expected a start command");
        };
        assert_eq!(args.question.join(" "), "Where do we eat");
        assert_eq!(args.duration, vec!["1h"]);
        assert_eq!(args.name.join(" "), "team lunch");
        assert_eq!(args.options, vec!["pizza", "tacos"]);
    }

    #[test]
    fn test_parse_ignores_foreign_messages() {
        assert!(parse("hello there", "!").is_none());
        assert!(parse("!play despacito", "!").is_none());
        assert!(parse("?qplist", "!").is_none());
        assert!(parse("!!!qpvote -n lunch -o 1", "!").is_none());
        assert!(parse("!-qpvote -n lunch -o 1", "!").is_none());
        assert!(parse("qpvote -n lunch -o 1", "!").is_none());
    }

    #[test]
    fn test_help_topic_accepts_prefixed_name() {
        let Some(Ok(Command::Help(topic))) = parse("!qphelp !qpstop", "!") else {
            panic!("expected a help command");
        };
        assert_eq!(topic, Some(CommandKind::Stop));
    }

    #[test]
    fn test_parse_missing_argument_is_failure() {
        let Some(Err(failure)) = parse("!qpvote -o 1", "!") else {
            panic!("expected a parse failure");
        };
        assert_eq!(failure.kind, CommandKind::Vote);
    }

    #[test]
    fn test_parse_list_positional_name() {
        let Some(Ok(Command::List(args))) = parse("!qplist team lunch", "!") else {
            panic!("expected a list command");
        };
        assert_eq!(args.words, vec!["team", "lunch"]);
        assert!(args.name.is_empty());
    }

    fn author(id: &str) -> Author {
        Author {
            id: id.to_string(),
            mention: format!("@{id}"),
        }
    }

    fn dispatcher(h: &Harness) -> Dispatcher {
        Dispatcher::new(
            h.engine.clone(),
            create_event_broadcaster(),
            "!".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_full_poll_conversation() {
        let h = harness().await;
        let bot = dispatcher(&h);

        let reply = bot
            .handle(&author("alice"), "!qpstart -q Best color? -n colors -o red blue green")
            .await
            .unwrap();
        assert!(reply.starts_with("Poll `colors` started!"));

        let again = bot
            .handle(&author("bob"), "!qpstart -q Other -n colors -o x")
            .await
            .unwrap();
        assert!(again.starts_with("Poll with the name colors already exists."));

        let voted = bot.handle(&author("bob"), "!qpvote -n colors -o 2").await.unwrap();
        assert!(voted.starts_with("Thank you for voting @bob"));

        let twice = bot.handle(&author("bob"), "!qpvote -n colors -o red").await.unwrap();
        assert!(twice.starts_with("@bob, can't vote more than once."));

        let listed = bot.handle(&author("carol"), "!qplist colors").await.unwrap();
        assert!(listed.contains("Question: Best color?"));

        let denied = bot.handle(&author("bob"), "!qpstop -n colors").await.unwrap();
        assert!(denied.contains("Permission denied"));

        let stopped = bot.handle(&author("alice"), "!qpstop -n colors").await.unwrap();
        assert!(stopped.starts_with("Poll `colors` has ended!"));
        assert!(stopped.contains("1. blue"));

        let empty = bot.handle(&author("carol"), "!qplist -n colors").await.unwrap();
        assert!(empty.starts_with("No active polls"));
    }

    #[tokio::test]
    async fn test_usage_hint_on_bad_arguments() {
        let h = harness().await;
        let bot = dispatcher(&h);

        let reply = bot.handle(&author("alice"), "!qpstart -n lonely").await.unwrap();
        assert!(reply.starts_with("Use the command:\n`!qpstart"));
        assert!(reply.ends_with("`!qphelp qpstart`"));

        let dup = bot
            .handle(&author("alice"), "!qpstart -q Pick -n dup -o a a")
            .await
            .unwrap();
        assert!(dup.contains("is listed twice"));
    }

    #[tokio::test]
    async fn test_timed_out_start_still_finishes() {
        let h = harness().await;
        let events = create_event_broadcaster();
        let mut rx = events.subscribe();
        let bot = Dispatcher::new(h.engine.clone(), events, "!".to_string(), Duration::ZERO);

        let reply = bot
            .handle(&author("alice"), "!qpstart -q Lunch? -n lunch -o pizza tacos")
            .await
            .unwrap();
        assert!(reply.contains("busy"));

        let PollEvent::PollStarted(announcement) = rx.recv().await.unwrap() else {
            panic!("expected a start announcement");
        };
        assert_eq!(announcement.poll_name, "lunch");
        assert_eq!(h.engine.list(Some("lunch"), None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_help_and_non_commands() {
        let h = harness().await;
        let bot = dispatcher(&h);

        assert!(bot.handle(&author("alice"), "just chatting").await.is_none());
        let help = bot.handle(&author("alice"), "!qphelp qpvote").await.unwrap();
        assert!(help.contains("-o/--option"));
    }
}
