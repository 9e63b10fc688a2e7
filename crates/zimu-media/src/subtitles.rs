//! Caption track selection and parsing.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use zimu_models::{Segment, SubtitleSource};

use crate::ytdlp::{SubtitleFormat, VideoInfo};

/// Languages tried in order, manual tracks before automatic ones.
pub const LANGUAGE_PRIORITY: [&str; 5] = ["zh-Hans", "zh-CN", "zh", "zh-TW", "en"];

/// Timed formats accepted when json3 is not offered.
const FALLBACK_FORMATS: [&str; 3] = ["srv1", "vtt", "srv2"];

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(\d{2,}):)?(\d{2}):(\d{2})[.,](\d{3})\s*-->\s*(?:(\d{2,}):)?(\d{2}):(\d{2})[.,](\d{3})",
    )
    .expect("valid cue timing regex")
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid markup regex"));

/// A caption file chosen for download.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub source: SubtitleSource,
    pub language: String,
    pub ext: String,
    pub url: String,
}

/// Pick the best caption track from a probe.
///
/// The first language in [`LANGUAGE_PRIORITY`] present among manual
/// subtitles wins, else the first among automatic captions. Within that
/// language json3 is preferred, then srv1/vtt/srv2. A chosen language with
/// no usable format yields `None`.
pub fn select_track(info: &VideoInfo) -> Option<SubtitleTrack> {
    let (source, language, formats) = LANGUAGE_PRIORITY
        .iter()
        .find_map(|lang| {
            info.subtitles
                .get(*lang)
                .map(|f| (SubtitleSource::Official, *lang, f))
        })
        .or_else(|| {
            LANGUAGE_PRIORITY.iter().find_map(|lang| {
                info.automatic_captions
                    .get(*lang)
                    .map(|f| (SubtitleSource::AutoGenerated, *lang, f))
            })
        })?;

    let format = pick_format(formats)?;
    Some(SubtitleTrack {
        source,
        language: language.to_string(),
        ext: format.ext.clone(),
        url: format.url.clone(),
    })
}

fn pick_format(formats: &[SubtitleFormat]) -> Option<&SubtitleFormat> {
    let usable = |f: &&SubtitleFormat| !f.url.is_empty();
    formats
        .iter()
        .filter(usable)
        .find(|f| f.ext == "json3")
        .or_else(|| {
            formats
                .iter()
                .filter(usable)
                .find(|f| FALLBACK_FORMATS.contains(&f.ext.as_str()))
        })
}

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Option<Vec<Json3Event>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: Option<f64>,
    #[serde(default)]
    d_duration_ms: Option<f64>,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: Option<String>,
}

/// Parse YouTube's json3 caption event list.
pub fn parse_json3(raw: &str) -> Result<Vec<Segment>, serde_json::Error> {
    let doc: Json3Document = serde_json::from_str(raw)?;

    let segments = doc
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let text: String = event
                .segs
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| s.utf8)
                .collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let start_ms = event.t_start_ms.unwrap_or(0.0);
            let duration_ms = event.d_duration_ms.unwrap_or(0.0);
            Some(Segment::new(
                start_ms / 1000.0,
                (start_ms + duration_ms) / 1000.0,
                text,
            ))
        })
        .collect();

    Ok(segments)
}

fn cue_seconds(caps: &Captures<'_>, first: usize) -> f64 {
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    part(first) * 3600.0 + part(first + 1) * 60.0 + part(first + 2) + part(first + 3) / 1000.0
}

/// Parse WebVTT (or SRT) cues. Text lines of a cue are joined with spaces
/// and inline markup is dropped; cues left empty are skipped.
pub fn parse_vtt(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut lines = raw.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(caps) = CUE_TIMING.captures(line) else {
            continue;
        };
        let start = cue_seconds(&caps, 1);
        let end = cue_seconds(&caps, 5);

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            let next = next.trim();
            if next.is_empty() {
                break;
            }
            text_lines.push(next.to_string());
            lines.next();
        }

        let text = MARKUP.replace_all(&text_lines.join(" "), "").trim().to_string();
        if !text.is_empty() {
            segments.push(Segment::new(start, end, text));
        }
    }

    segments
}

/// Parse a downloaded caption file, json3 first and WebVTT otherwise.
pub fn parse_caption(raw: &str) -> Vec<Segment> {
    parse_json3(raw).unwrap_or_else(|_| parse_vtt(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn formats(exts: &[&str]) -> Vec<SubtitleFormat> {
        exts.iter()
            .map(|ext| SubtitleFormat {
                ext: ext.to_string(),
                url: format!("https://captions.example/{}", ext),
            })
            .collect()
    }

    #[test]
    fn test_manual_track_beats_automatic() {
        let info = VideoInfo {
            subtitles: HashMap::from([("en".to_string(), formats(&["vtt", "json3"]))]),
            automatic_captions: HashMap::from([("zh-Hans".to_string(), formats(&["json3"]))]),
            ..Default::default()
        };

        let track = select_track(&info).unwrap();
        assert_eq!(track.source, SubtitleSource::Official);
        assert_eq!(track.language, "en");
        assert_eq!(track.ext, "json3");
    }

    #[test]
    fn test_language_priority_and_fallback_format() {
        let info = VideoInfo {
            automatic_captions: HashMap::from([
                ("en".to_string(), formats(&["json3"])),
                ("zh-TW".to_string(), formats(&["ttml", "srv2", "vtt"])),
            ]),
            ..Default::default()
        };

        let track = select_track(&info).unwrap();
        assert_eq!(track.source, SubtitleSource::AutoGenerated);
        assert_eq!(track.language, "zh-TW");
        assert_eq!(track.ext, "srv2");
    }

    #[test]
    fn test_no_usable_track() {
        assert!(select_track(&VideoInfo::default()).is_none());

        let info = VideoInfo {
            subtitles: HashMap::from([("zh".to_string(), formats(&["ttml"]))]),
            ..Default::default()
        };
        assert!(select_track(&info).is_none());
    }

    #[test]
    fn test_parse_json3_events() {
        let raw = r#"{"events": [
            {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "你好"}, {"utf8": "世界"}]},
            {"tStartMs": 1500, "dDurationMs": 10, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 2000},
            {"tStartMs": 2500, "dDurationMs": 500, "segs": [{"utf8": " again "}]}
        ]}"#;

        let segments = parse_json3(raw).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], Segment::new(0.0, 1.5, "你好世界"));
        assert_eq!(segments[1], Segment::new(2.5, 3.0, "again"));
    }

    #[test]
    fn test_parse_vtt_cues() {
        let raw = "WEBVTT\n\n\
                   00:00:01.000 --> 00:00:04.500 align:start\n\
                   <c>Hello</c> there\n\
                   second line\n\n\
                   00:01:00,250 --> 00:01:02,000\n\
                   <i></i>\n\n\
                   01:02.000 --> 01:03.000\n\
                   short form\n";

        let segments = parse_vtt(raw);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello there second line");
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].end, 4.5);
        assert_eq!(segments[1].text, "short form");
        assert_eq!(segments[1].start, 62.0);
    }

    #[test]
    fn test_parse_caption_falls_back_to_vtt() {
        let raw = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nhi\n";
        assert_eq!(parse_caption(raw), vec![Segment::new(0.0, 1.0, "hi")]);
    }
}
