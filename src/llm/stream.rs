use serde::Deserialize;

use crate::error::ChatError;

/// Splits a byte stream into complete top-level JSON objects.
///
/// Reads may end anywhere, including in the middle of an object, a
/// multi-byte character or a framing token; partial data is kept until it
/// can be classified. Between objects only whitespace and event-stream
/// framing are accepted: `data:` prefixes, `[DONE]`, and whole `event:`,
/// `id:`, `retry:` or `:` comment lines. Anything else is a protocol error.
#[derive(Debug, Default)]
pub struct JsonObjectDecoder {
    buf: Vec<u8>,
    /// Scan position inside `buf`.
    pos: usize,
    /// Whether `buf[0]` opens an object that has not been closed yet.
    in_object: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Objects handed out so far.
    objects: usize,
}

const DATA_PREFIX: &[u8] = b"data:";
const DONE_MARKER: &[u8] = b"[DONE]";
/// Event-stream fields that carry no payload for us; the whole line is skipped.
const IGNORED_FIELDS: [&[u8]; 4] = [b":", b"event:", b"id:", b"retry:"];

enum Framing {
    /// This many bytes are framing and can be dropped.
    Skip(usize),
    /// Not enough bytes yet to tell.
    Incomplete,
    Invalid,
}

fn classify_framing(rest: &[u8]) -> Framing {
    if rest.starts_with(DATA_PREFIX) {
        return Framing::Skip(DATA_PREFIX.len());
    }
    if rest.starts_with(DONE_MARKER) {
        return Framing::Skip(DONE_MARKER.len());
    }
    if IGNORED_FIELDS.iter().any(|field| rest.starts_with(field)) {
        return match rest.iter().position(|&b| b == b'\n') {
            Some(newline) => Framing::Skip(newline + 1),
            None => Framing::Incomplete,
        };
    }

    let tokens = [DATA_PREFIX, DONE_MARKER].into_iter().chain(IGNORED_FIELDS);
    if tokens.into_iter().any(|token| token.starts_with(rest)) {
        Framing::Incomplete
    } else {
        Framing::Invalid
    }
}

fn unexpected(rest: &[u8]) -> ChatError {
    let shown = String::from_utf8_lossy(&rest[..rest.len().min(40)]).into_owned();
    ChatError::Protocol(format!("unexpected data outside a JSON object: {shown:?}"))
}

impl JsonObjectDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete object, if the buffered bytes contain one.
    pub fn next_object(&mut self) -> Result<Option<Vec<u8>>, ChatError> {
        while self.pos < self.buf.len() {
            let b = self.buf[self.pos];

            if !self.in_object {
                if b.is_ascii_whitespace() {
                    self.pos += 1;
                    continue;
                }
                if b == b'{' {
                    self.buf.drain(..self.pos);
                    self.pos = 0;
                    self.in_object = true;
                    self.depth = 1;
                    self.pos += 1;
                    continue;
                }
                match classify_framing(&self.buf[self.pos..]) {
                    Framing::Skip(n) => {
                        self.pos += n;
                        continue;
                    }
                    Framing::Incomplete => {
                        self.buf.drain(..self.pos);
                        self.pos = 0;
                        return Ok(None);
                    }
                    Framing::Invalid => return Err(unexpected(&self.buf[self.pos..])),
                }
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else {
                match b {
                    b'"' => self.in_string = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            let end = self.pos + 1;
                            let object: Vec<u8> = self.buf.drain(..end).collect();
                            self.pos = 0;
                            self.in_object = false;
                            self.objects += 1;
                            return Ok(Some(object));
                        }
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }

        if !self.in_object {
            self.buf.clear();
            self.pos = 0;
        }
        Ok(None)
    }

    /// True while part of an object is still waiting for more bytes.
    pub fn has_partial(&self) -> bool {
        self.in_object
    }

    /// Call once the stream has ended.
    pub fn finish(&self) -> Result<(), ChatError> {
        if self.has_partial() {
            return Err(ChatError::Protocol(format!(
                "stream ended inside a JSON object ({} byte(s) pending)",
                self.buf.len()
            )));
        }

        // A trailing comment line may legitimately lack its newline.
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        if !rest.is_empty() && !IGNORED_FIELDS.iter().any(|field| rest.starts_with(field)) {
            return Err(unexpected(rest));
        }

        if self.objects == 0 {
            return Err(ChatError::Protocol("stream ended without any JSON object".to_string()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ChunkEnvelope {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    message: Option<ChunkContent>,
    delta: Option<ChunkContent>,
}

#[derive(Deserialize)]
struct ChunkContent {
    content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
}

/// Text carried by one streamed object.
///
/// Reads `choices[0].message.content`, falling back to `choices[0].delta.content`.
pub fn parse_chunk(object: &[u8]) -> Result<Option<String>, ChatError> {
    let chunk: ChunkEnvelope = serde_json::from_slice(object)
        .map_err(|e| ChatError::Protocol(format!("invalid stream chunk: {e}")))?;

    if let Some(err) = chunk.error {
        return Err(ChatError::Api {
            status: 200,
            message: err.message.unwrap_or_else(|| "unknown".to_string()),
        });
    }

    let content = chunk.choices.into_iter().next().and_then(|c| {
        c.message
            .and_then(|m| m.content)
            .or_else(|| c.delta.and_then(|d| d.content))
    });

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut JsonObjectDecoder) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(obj) = decoder.next_object().unwrap() {
            out.push(String::from_utf8(obj).unwrap());
        }
        out
    }

    #[test]
    fn yields_back_to_back_objects() {
        let mut d = JsonObjectDecoder::new();
        d.push(br#"{"a":1}{"b":2} {"c":3}"#);
        assert_eq!(drain(&mut d), vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
        assert!(d.finish().is_ok());
    }

    #[test]
    fn completes_objects_split_across_reads() {
        let mut d = JsonObjectDecoder::new();
        d.push(br#"{"choices":[{"mess"#);
        assert!(d.next_object().unwrap().is_none());
        assert!(d.has_partial());

        d.push(br#"age":{"content":"hi"}}]}{"x""#);
        assert_eq!(drain(&mut d), vec![r#"{"choices":[{"message":{"content":"hi"}}]}"#]);
        assert!(d.finish().is_err());

        d.push(b":1}");
        assert_eq!(drain(&mut d), vec![r#"{"x":1}"#]);
        assert!(d.finish().is_ok());
    }

    #[test]
    fn braces_and_quotes_inside_strings_are_ignored() {
        let mut d = JsonObjectDecoder::new();
        d.push(br#"{"s":"}{ \"quoted\" \\"}"#);
        assert_eq!(drain(&mut d), vec![r#"{"s":"}{ \"quoted\" \\"}"#]);
    }

    #[test]
    fn skips_server_sent_event_framing() {
        let mut d = JsonObjectDecoder::new();
        d.push(b"data: {\"n\":1}\n\ndata: {\"n\":2}\n\ndata: [DONE]\n\n");
        assert_eq!(drain(&mut d), vec![r#"{"n":1}"#, r#"{"n":2}"#]);
        assert!(d.finish().is_ok());
    }

    #[test]
    fn skips_event_fields_and_comment_lines() {
        let mut d = JsonObjectDecoder::new();
        d.push(b": keep-alive\nevent: message\nid: 7\nretry: 1000\ndata: {\"n\":1}\n\n");
        assert_eq!(drain(&mut d), vec![r#"{"n":1}"#]);
        assert!(d.finish().is_ok());
    }

    #[test]
    fn framing_tokens_split_across_reads() {
        let mut d = JsonObjectDecoder::new();
        d.push(b"da");
        assert!(d.next_object().unwrap().is_none());
        d.push(b"ta: {\"n\":1}\n\ndata: [DO");
        assert_eq!(drain(&mut d), vec![r#"{"n":1}"#]);
        d.push(b"NE]\n\n");
        assert!(drain(&mut d).is_empty());
        assert!(d.finish().is_ok());
    }

    #[test]
    fn text_outside_objects_is_rejected() {
        let mut d = JsonObjectDecoder::new();
        d.push(b"<html>gateway says hi</html>");
        assert!(matches!(d.next_object(), Err(ChatError::Protocol(_))));
    }

    #[test]
    fn top_level_arrays_and_stray_tokens_are_rejected() {
        let mut d = JsonObjectDecoder::new();
        d.push(br#"[{"n":1}]"#);
        assert!(matches!(d.next_object(), Err(ChatError::Protocol(_))));

        let mut d = JsonObjectDecoder::new();
        d.push(br#"{"n":1} oops {"n":2}"#);
        assert_eq!(d.next_object().unwrap().unwrap(), br#"{"n":1}"#);
        assert!(matches!(d.next_object(), Err(ChatError::Protocol(_))));
    }

    #[test]
    fn stream_without_objects_is_rejected() {
        assert!(JsonObjectDecoder::new().finish().is_err());

        let mut d = JsonObjectDecoder::new();
        d.push(b"\n\ndata: [DONE]\n\n");
        assert!(drain(&mut d).is_empty());
        assert!(matches!(d.finish(), Err(ChatError::Protocol(_))));
    }

    #[test]
    fn unfinished_framing_at_the_end_is_rejected() {
        let mut d = JsonObjectDecoder::new();
        d.push(br#"{"n":1}da"#);
        assert_eq!(drain(&mut d), vec![r#"{"n":1}"#]);
        assert!(matches!(d.finish(), Err(ChatError::Protocol(_))));
    }

    #[test]
    fn multibyte_characters_split_across_reads() {
        let text = r#"{"t":"привет"}"#.as_bytes();
        let mut d = JsonObjectDecoder::new();
        d.push(&text[..9]);
        assert!(d.next_object().unwrap().is_none());
        d.push(&text[9..]);
        let obj = d.next_object().unwrap().unwrap();
        assert_eq!(obj, text);
    }

    #[test]
    fn parse_chunk_reads_message_content() {
        let chunk = br#"{"choices":[{"message":{"content":"Fix parser"}}]}"#;
        assert_eq!(parse_chunk(chunk).unwrap().as_deref(), Some("Fix parser"));
    }

    #[test]
    fn parse_chunk_falls_back_to_delta() {
        let chunk = br#"{"choices":[{"delta":{"content":"Add","role":"assistant"},"index":0}]}"#;
        assert_eq!(parse_chunk(chunk).unwrap().as_deref(), Some("Add"));
    }

    #[test]
    fn parse_chunk_without_content_is_none() {
        let chunk = br#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{}}"#;
        assert_eq!(parse_chunk(chunk).unwrap(), None);
    }

    #[test]
    fn parse_chunk_reports_embedded_errors() {
        let chunk = br#"{"error":{"message":"rate limited"}}"#;
        match parse_chunk(chunk) {
            Err(ChatError::Api { message, .. }) => assert_eq!(message, "rate limited"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_chunk_rejects_garbage() {
        assert!(matches!(parse_chunk(b"{nope}"), Err(ChatError::Protocol(_))));
        assert!(matches!(
            parse_chunk(b"{\"choices\":[{\"message\":{\"content\":\"\xff\"}}]}"),
            Err(ChatError::Protocol(_))
        ));
    }
}
