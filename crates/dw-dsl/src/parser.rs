//! Script parser.
//!
//! A script is a sequence of state sections separated by `----` lines. Each
//! section opens with a `### ID` header followed by blank-line separated
//! paragraphs. When the final paragraph is made of `> ` reply lines the state
//! is a choice state; otherwise it is terminal.
//!
//! Parsing is a pure function of the source text: each state body is reduced
//! to an explicit [`ParsedBody`] and nothing is carried from one state to the
//! next.

use std::ops::Range;
use std::sync::LazyLock;

use dw_core::{
    Component, Condition, Lock, MessageBlock, ModifierChange, MoneyGain, Reply, StateDefinition,
    StateId, TerminalKind,
};
use regex::Regex;

use crate::config::ScriptConfig;
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::{Token, lex};

/// Source span as a byte range.
pub type Span = Range<usize>;

/// Line that separates state sections.
pub const SEPARATOR: &str = "----";
/// Prefix of reply lines.
pub const REPLY_MARKER: char = '>';

static REPLY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^>\s*(?:<if ([^>]+)>)?(.+?)\s+\((\d+)\)\s*(?:</if>)?\s*$")
        .expect("reply pattern is valid")
});

/// A parsed state together with the span of its header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedState {
    /// The state itself.
    pub state: StateDefinition,
    /// The `### ID` line, for diagnostics about the whole state.
    pub header: Span,
}

/// The message body of one state: its blocks and the lock hoisted out of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBody {
    /// Message blocks in document order.
    pub blocks: Vec<MessageBlock>,
    /// The `<input/>` lock, wherever it appeared in the body.
    pub lock: Option<Lock>,
}

/// A non-blank line and the offset where it starts.
type Line<'a> = (usize, &'a str);

/// Parse newline-normalized source into states, in document order.
pub fn parse_states(source: &str, config: &ScriptConfig) -> ScriptResult<Vec<ParsedState>> {
    section_spans(source)
        .into_iter()
        .filter(|span| !source[span.clone()].trim().is_empty())
        .map(|span| parse_section(source, span, config))
        .collect()
}

fn lines_with_offsets(text: &str, base: usize) -> impl Iterator<Item = Line<'_>> {
    let mut offset = base;
    text.split('\n').map(move |line| {
        let start = offset;
        offset += line.len() + 1;
        (start, line)
    })
}

fn section_spans(source: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (offset, line) in lines_with_offsets(source, 0) {
        if line.trim_end() == SEPARATOR {
            spans.push(start..offset);
            start = (offset + line.len() + 1).min(source.len());
        }
    }
    spans.push(start..source.len());
    spans
}

fn malformed(span: Span, message: impl Into<String>) -> ScriptError {
    ScriptError::malformed(span, message)
}

fn line_span((offset, line): Line<'_>) -> Span {
    offset..offset + line.trim_end().len()
}

fn parse_section(source: &str, span: Span, config: &ScriptConfig) -> ScriptResult<ParsedState> {
    let mut lines = lines_with_offsets(&source[span.clone()], span.start)
        .skip_while(|(_, line)| line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Err(malformed(span, "empty state section"));
    };
    let header_span = line_span(header);
    let id = parse_header(header.1, header_span.clone())?;

    let mut paragraphs: Vec<Vec<Line<'_>>> = Vec::new();
    let mut in_paragraph = false;
    for line in lines {
        if line.1.trim().is_empty() {
            in_paragraph = false;
        } else if in_paragraph {
            if let Some(paragraph) = paragraphs.last_mut() {
                paragraph.push(line);
            }
        } else {
            paragraphs.push(vec![line]);
            in_paragraph = true;
        }
    }

    let Some(last) = paragraphs.last() else {
        return Err(malformed(header_span, format!("state {id} has no content")));
    };

    let is_choice = last[0].1.starts_with(REPLY_MARKER);
    let (body_paragraphs, replies) = if is_choice {
        let replies = parse_replies(last)?;
        (&paragraphs[..paragraphs.len() - 1], replies)
    } else {
        (&paragraphs[..], Vec::new())
    };

    let body_span = match (body_paragraphs.first(), body_paragraphs.last()) {
        (Some(first), Some(end)) => paragraph_span(first).start..paragraph_span(end).end,
        _ => header_span.end..header_span.end,
    };
    let body = parse_body(&source[body_span.clone()], body_span.start)?;

    let terminal = if is_choice {
        TerminalKind::None
    } else {
        let closing = &source[paragraph_span(last)];
        if closing.contains(config.lethal_marker.as_str()) {
            TerminalKind::Lethal
        } else {
            match &config.victory_marker {
                Some(marker) if !closing.contains(marker.as_str()) => {
                    return Err(malformed(
                        paragraph_span(last),
                        format!(
                            "state {id} has no replies and is marked neither lethal (`{}`) nor victory (`{marker}`)",
                            config.lethal_marker
                        ),
                    ));
                }
                _ => TerminalKind::Victory,
            }
        }
    };

    Ok(ParsedState {
        state: StateDefinition {
            id,
            message_blocks: body.blocks,
            replies,
            lock: body.lock,
            terminal,
        },
        header: header_span,
    })
}

fn paragraph_span(paragraph: &[Line<'_>]) -> Span {
    let start = paragraph.first().map_or(0, |(offset, _)| *offset);
    let end = paragraph.last().map_or(start, |line| line_span(*line).end);
    start..end
}

fn parse_header(header: &str, span: Span) -> ScriptResult<StateId> {
    let trimmed = header.trim();
    let rest = trimmed.trim_start_matches('#');
    if rest.len() == trimmed.len() || !rest.starts_with(char::is_whitespace) {
        return Err(malformed(
            span,
            format!("expected a state header like `### 12`, found `{trimmed}`"),
        ));
    }
    let digits = rest.trim();
    digits
        .parse::<StateId>()
        .map_err(|_| malformed(span, format!("invalid state id `{digits}`")))
}

fn parse_condition(source: &str, span: Span) -> ScriptResult<Condition> {
    Condition::parse(source).map_err(|e| malformed(span, format!("invalid condition: {e}")))
}

fn parse_replies(paragraph: &[Line<'_>]) -> ScriptResult<Vec<Reply>> {
    paragraph
        .iter()
        .map(|line| {
            let span = line_span(*line);
            let caps = REPLY_LINE.captures(line.1.trim_end()).ok_or_else(|| {
                malformed(
                    span.clone(),
                    format!("expected a reply like `> text (12)`, found `{}`", line.1.trim()),
                )
            })?;

            let condition = caps
                .get(1)
                .map(|m| parse_condition(m.as_str(), span.clone()))
                .transpose()?;
            let destination = caps[3]
                .parse::<StateId>()
                .map_err(|_| malformed(span.clone(), format!("invalid state id `{}`", &caps[3])))?;

            Ok(Reply {
                text: caps[2].replace("**", "*"),
                condition,
                destination,
            })
        })
        .collect()
}

/// What an inline tag turns into.
enum Inline {
    Component(Component),
    Lock(Lock),
}

/// Parse a state body into message blocks, hoisting any `<input/>` lock.
pub fn parse_body(body: &str, base: usize) -> ScriptResult<ParsedBody> {
    let mut parsed = ParsedBody::default();
    let mut components: Vec<Component> = Vec::new();
    let mut open: Option<(Condition, Span)> = None;

    for (token, span) in lex(body, base) {
        match token {
            Token::Text(text) => {
                let text = text.replace("**", "*");
                let text = text.trim_start();
                if text.is_empty() {
                    continue;
                }
                // Text around a hoisted lock joins the preceding run.
                match components.last_mut() {
                    Some(Component::Text { text: run }) => run.push_str(text),
                    _ => components.push(Component::text(text)),
                }
            }
            Token::Tag { name, args } => match parse_tag(&name, &args, span.clone())? {
                Inline::Component(component) => components.push(component),
                Inline::Lock(lock) => {
                    if parsed.lock.is_some() {
                        return Err(malformed(span, "a state can hold only one <input/> lock"));
                    }
                    parsed.lock = Some(lock);
                }
            },
            Token::IfOpen(expr) => {
                if open.is_some() {
                    return Err(malformed(span, "<if> spans cannot nest"));
                }
                let condition = parse_condition(&expr, span.clone())?;
                if !components.is_empty() {
                    parsed
                        .blocks
                        .push(MessageBlock::new(std::mem::take(&mut components)));
                }
                open = Some((condition, span));
            }
            Token::IfClose => {
                let (condition, _) = open
                    .take()
                    .ok_or_else(|| malformed(span, "</if> without a matching <if>"))?;
                parsed.blocks.push(MessageBlock::conditional(
                    condition,
                    std::mem::take(&mut components),
                ));
            }
        }
    }

    if let Some((_, span)) = open {
        return Err(malformed(span, "unterminated <if> span"));
    }
    if !components.is_empty() {
        parsed.blocks.push(MessageBlock::new(components));
    }
    Ok(parsed)
}

fn parse_tag(name: &str, args: &str, span: Span) -> ScriptResult<Inline> {
    let words: Vec<&str> = args.split_whitespace().collect();
    match name {
        "mod" => match words.as_slice() {
            [tag] if *tag != "not" => Ok(Inline::Component(Component::Modifier(
                ModifierChange::add(*tag),
            ))),
            ["not", tag] => Ok(Inline::Component(Component::Modifier(
                ModifierChange::remove(*tag),
            ))),
            _ => Err(malformed(
                span,
                format!("expected `<mod TAG/>` or `<mod not TAG/>`, found `<mod {args}/>`"),
            )),
        },
        "mb" => {
            let wait_secs = match words.as_slice() {
                [] => Some(0),
                [wait] => wait
                    .strip_prefix("wait=")
                    .and_then(|n| n.parse::<u64>().ok()),
                _ => None,
            };
            wait_secs
                .map(|wait_secs| Inline::Component(Component::Break { wait_secs }))
                .ok_or_else(|| {
                    malformed(span, format!("expected `<mb/>` or `<mb wait=N/>`, found `<mb {args}/>`"))
                })
        }
        "money" => parse_money(&words)
            .map(|gain| Inline::Component(Component::Money { gain }))
            .ok_or_else(|| {
                malformed(
                    span,
                    format!("invalid money amount `{args}`: expected N, 1-N or WORD N"),
                )
            }),
        "input" => {
            let lock = match words.as_slice() {
                [kind, correct, wrong] => correct
                    .strip_prefix("correct=")
                    .and_then(|c| c.parse::<StateId>().ok())
                    .zip(
                        wrong
                            .strip_prefix("wrong=")
                            .and_then(|w| w.parse::<StateId>().ok()),
                    )
                    .map(|(correct, wrong)| Lock {
                        kind: kind.to_string(),
                        correct,
                        wrong,
                    }),
                _ => None,
            };
            lock.map(Inline::Lock).ok_or_else(|| {
                malformed(
                    span,
                    format!("expected `<input KIND correct=ID wrong=ID/>`, found `<input {args}/>`"),
                )
            })
        }
        other => Err(malformed(span, format!("unknown tag <{other}/>"))),
    }
}

fn parse_money(words: &[&str]) -> Option<MoneyGain> {
    let up_to = |max: &str| max.parse::<u32>().ok().filter(|m| *m >= 1).map(MoneyGain::UpTo);
    match words {
        [amount] => match amount.split_once('-') {
            Some(("1", max)) => up_to(max),
            Some(_) => None,
            None => amount.parse::<u32>().ok().map(MoneyGain::Fixed),
        },
        [_, max] => up_to(max),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_core::{ModifierAction, Test};

    fn parse(source: &str) -> ScriptResult<Vec<StateDefinition>> {
        parse_states(source, &ScriptConfig::default())
            .map(|states| states.into_iter().map(|p| p.state).collect())
    }

    fn parse_one(source: &str) -> StateDefinition {
        let mut states = parse(source).unwrap();
        assert_eq!(states.len(), 1);
        states.remove(0)
    }

    fn error_message(source: &str) -> String {
        match parse(source) {
            Err(ScriptError::Malformed { message, .. }) => message,
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn parse_choice_state() {
        let state = parse_one("### 1\n\nYou wake up.\n\n> Get up (2)\n> Sleep (3)");
        assert_eq!(state.id, 1);
        assert_eq!(state.terminal, TerminalKind::None);
        assert_eq!(
            state.message_blocks,
            vec![MessageBlock::new(vec![Component::text("You wake up.")])]
        );
        assert_eq!(
            state.replies,
            vec![Reply::new("Get up", 2), Reply::new("Sleep", 3)]
        );
    }

    #[test]
    fn parse_multiple_sections() {
        let states = parse(
            "### 1\n\nStart.\n\n> Next (2)\n----\n### 2\n\nMiddle.\n\n> Back (1)\n\n----\n\n### 3\n\nThe end.\n",
        )
        .unwrap();
        assert_eq!(
            states.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(states[2].terminal, TerminalKind::Victory);
    }

    #[test]
    fn body_keeps_inner_paragraph_breaks() {
        let state = parse_one("### 4\n\nFirst.\n\nSecond.\n\n> Go (1)");
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("First.\n\nSecond.")]
        );
    }

    #[test]
    fn choice_state_may_have_empty_body() {
        let state = parse_one("### 2\n\n> Only option (1)");
        assert!(state.message_blocks.is_empty());
        assert_eq!(state.replies.len(), 1);
    }

    #[test]
    fn lethal_and_victory_terminals() {
        let lethal = parse_one("### 5\n\nThe floor gives way.\n\n**потрачено**");
        assert_eq!(lethal.terminal, TerminalKind::Lethal);
        assert!(lethal.replies.is_empty());
        assert_eq!(
            lethal.message_blocks[0].components,
            vec![Component::text("The floor gives way.\n\n*потрачено*")]
        );

        let victory = parse_one("### 6\n\nYou wake up for real.");
        assert_eq!(victory.terminal, TerminalKind::Victory);
    }

    #[test]
    fn custom_markers() {
        let config = ScriptConfig::default()
            .with_lethal_marker("WASTED")
            .with_victory_marker("THE END");
        let states = parse_states("### 7\n\nWASTED", &config).unwrap();
        assert_eq!(states[0].state.terminal, TerminalKind::Lethal);
        let states = parse_states("### 7\n\nTHE END", &config).unwrap();
        assert_eq!(states[0].state.terminal, TerminalKind::Victory);
        assert!(parse_states("### 7\n\nJust text.", &config).is_err());
    }

    #[test]
    fn conditional_blocks_in_document_order() {
        let state = parse_one("### 1\n\nBefore <if lamp and not 3>lit</if> after\n\n> Go (1)");
        assert_eq!(state.message_blocks.len(), 3);
        assert!(state.message_blocks[0].condition.is_none());
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("Before ")]
        );

        let cond = state.message_blocks[1].condition.as_ref().unwrap();
        assert_eq!(cond.to_string(), "lamp and not 3");
        assert_eq!(cond.atoms()[1].test, Test::Visited(3));
        assert_eq!(
            state.message_blocks[1].components,
            vec![Component::text("lit")]
        );

        assert_eq!(
            state.message_blocks[2].components,
            vec![Component::text("after")]
        );
    }

    #[test]
    fn inline_components_in_order() {
        let state = parse_one(
            "### 1\n\nHello {char_name}<mb wait=2/>\n<mod lamp/><mod not key/><money 1-5/><money 3/><money random 10/>Done<mb/>\n\n> Go (1)",
        );
        assert_eq!(
            state.message_blocks[0].components,
            vec![
                Component::text("Hello {char_name}"),
                Component::Break { wait_secs: 2 },
                Component::Modifier(ModifierChange::add("lamp")),
                Component::Modifier(ModifierChange::remove("key")),
                Component::Money {
                    gain: MoneyGain::UpTo(5)
                },
                Component::Money {
                    gain: MoneyGain::Fixed(3)
                },
                Component::Money {
                    gain: MoneyGain::UpTo(10)
                },
                Component::text("Done"),
                Component::Break { wait_secs: 0 },
            ]
        );
    }

    #[test]
    fn whitespace_between_tags_is_dropped() {
        let state = parse_one("### 1\n\n<mod a/>   \n  <mod b/>\n\n> Go (1)");
        let kinds: Vec<_> = state.message_blocks[0]
            .components
            .iter()
            .map(|c| match c {
                Component::Modifier(m) => (m.tag.as_str(), m.action),
                other => panic!("unexpected component {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![("a", ModifierAction::Add), ("b", ModifierAction::Add)]
        );
    }

    #[test]
    fn emphasis_is_collapsed() {
        let state = parse_one("### 1\n\nA **bold** move.\n\n> Be **brave** (1)");
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("A *bold* move.")]
        );
        assert_eq!(state.replies[0].text, "Be *brave*");
    }

    #[test]
    fn input_tag_is_hoisted_to_lock() {
        let state = parse_one(
            "### 4\n\nA keypad blinks.<input code correct=10 wrong=20/>\n\n> Step back (1)",
        );
        assert_eq!(
            state.lock,
            Some(Lock {
                kind: "code".to_string(),
                correct: 10,
                wrong: 20
            })
        );
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("A keypad blinks.")]
        );
    }

    #[test]
    fn text_around_a_lock_is_one_run() {
        let source = "### 1\n\nA keypad.<input code correct=1 wrong=1/> It hums.\n\n> Leave (1)";
        let state = parse_one(source);
        assert!(state.lock.is_some());
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("A keypad.It hums.")]
        );

        let printed = crate::print_script(std::slice::from_ref(&state), &ScriptConfig::default());
        assert_eq!(parse_one(&printed), state);
    }

    #[test]
    fn text_runs_stay_split_by_other_tags() {
        let state = parse_one("### 1\n\nA<mod lamp/>B<input code correct=1 wrong=1/>C\n\n> Go (1)");
        assert_eq!(
            state.message_blocks[0].components,
            vec![
                Component::text("A"),
                Component::Modifier(ModifierChange::add("lamp")),
                Component::text("BC"),
            ]
        );
    }

    #[test]
    fn lock_does_not_leak_into_next_state() {
        let states = parse(
            "### 1\n\n<input code correct=2 wrong=2/>\n\n> Go (2)\n----\n### 2\n\nPlain.\n\n> Back (1)",
        )
        .unwrap();
        assert!(states[0].lock.is_some());
        assert!(states[1].lock.is_none());
    }

    #[test]
    fn conditional_replies() {
        let state = parse_one(
            "### 1\n\nA shop.\n\n> Browse (2)\n> <if money>Buy the lamp (3)</if>\n> <if not 2 and key>Open (4)",
        );
        assert_eq!(state.replies.len(), 3);
        assert!(state.replies[0].condition.is_none());
        assert_eq!(state.replies[1].text, "Buy the lamp");
        assert_eq!(
            state.replies[1].condition.as_ref().unwrap().to_string(),
            "money"
        );
        assert_eq!(state.replies[1].destination, 3);
        assert_eq!(
            state.replies[2].condition.as_ref().unwrap().to_string(),
            "not 2 and key"
        );
    }

    #[test]
    fn reply_text_may_contain_parentheses() {
        let state = parse_one("### 1\n\nHm.\n\n> Take (two) apples (3)");
        assert_eq!(state.replies[0].text, "Take (two) apples");
        assert_eq!(state.replies[0].destination, 3);
    }

    #[test]
    fn parse_is_deterministic() {
        let source = "### 1\n\nHi <mod a/><if a>yes</if>\n\n> Go (2)\n----\n### 2\n\nBye.";
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }

    #[test]
    fn header_spans_point_at_headers() {
        let source = "### 1\n\nA.\n\n> B (2)\n----\n### 2\n\nC.";
        let states = parse_states(source, &ScriptConfig::default()).unwrap();
        assert_eq!(&source[states[0].header.clone()], "### 1");
        assert_eq!(&source[states[1].header.clone()], "### 2");
    }

    #[test]
    fn malformed_headers() {
        assert!(error_message("State 1\n\nText.").contains("state header"));
        assert!(error_message("###1\n\nText.").contains("state header"));
        assert!(error_message("### one\n\nText.").contains("invalid state id"));
    }

    #[test]
    fn header_without_content() {
        assert!(error_message("### 3\n").contains("no content"));
    }

    #[test]
    fn malformed_reply_line() {
        let msg = error_message("### 1\n\nText.\n\n> Go somewhere\n> Back (1)");
        assert!(msg.contains("expected a reply"), "{msg}");
    }

    #[test]
    fn malformed_tags() {
        assert!(error_message("### 1\n\n<mod/>\n\n> Go (1)").contains("<mod TAG/>"));
        assert!(error_message("### 1\n\n<mod a b/>\n\n> Go (1)").contains("<mod TAG/>"));
        assert!(error_message("### 1\n\n<mb wait=x/>\n\n> Go (1)").contains("<mb wait=N/>"));
        assert!(error_message("### 1\n\n<money lots/>\n\n> Go (1)").contains("money amount"));
        assert!(error_message("### 1\n\n<money 2-5/>\n\n> Go (1)").contains("money amount"));
        assert!(error_message("### 1\n\n<money 1-0/>\n\n> Go (1)").contains("money amount"));
        assert!(
            error_message("### 1\n\n<input code correct=1/>\n\n> Go (1)").contains("<input KIND")
        );
        assert!(
            error_message(
                "### 1\n\n<input a correct=1 wrong=1/><input b correct=1 wrong=1/>\n\n> Go (1)"
            )
            .contains("only one")
        );
    }

    #[test]
    fn malformed_if_spans() {
        assert!(error_message("### 1\n\n<if a>x<if b>y</if></if>\n\n> Go (1)").contains("nest"));
        assert!(error_message("### 1\n\nx</if>\n\n> Go (1)").contains("without a matching"));
        assert!(error_message("### 1\n\n<if a>x\n\n> Go (1)").contains("unterminated"));
        assert!(error_message("### 1\n\n<if a and>x</if>\n\n> Go (1)").contains("condition"));
    }

    #[test]
    fn error_spans_locate_the_problem() {
        let source = "### 1\n\nYou find <money lots/>.\n\n> Go (1)";
        let err = parse(source).unwrap_err();
        let span = err.span().unwrap();
        assert_eq!(&source[span], "<money lots/>");
    }

    #[test]
    fn unknown_angle_text_is_literal() {
        let state = parse_one("### 1\n\n2 < 3 <b>ok</b>\n\n> Go (1)");
        assert_eq!(
            state.message_blocks[0].components,
            vec![Component::text("2 < 3 <b>ok</b>")]
        );
    }
}
