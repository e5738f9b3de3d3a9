//! Media type parsing and negotiation.
//!
//! Quality values follow the usual `Accept` rules: a concrete type takes
//! the quality of the most specific range that covers it, so
//! `text/*, text/plain;q=0` refuses `text/plain`. Among equally weighted
//! ranges an exact type beats `type/*`, which beats `*/*`.

use std::cmp::Ordering;

use http::{header, HeaderMap};
use mime::Mime;

/// One `Accept` range with its quality in thousandths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptEntry {
    /// The media range, without its `q` parameter.
    pub range: Mime,
    /// Quality, `0..=1000`.
    pub quality: u16,
}

/// Ranking of one accept/produce pairing; higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchScore {
    quality: u16,
    accept_specificity: u8,
    produced_specificity: u8,
}

/// 0 for `*/*`, 1 for `type/*`, 2 for a concrete type.
pub fn specificity(media: &Mime) -> u8 {
    if media.type_() == mime::STAR {
        0
    } else if media.subtype() == mime::STAR {
        1
    } else {
        2
    }
}

/// Returns true if either side has a wildcard component.
pub fn is_wildcard(media: &Mime) -> bool {
    specificity(media) < 2
}

/// Type/subtype compatibility, honouring wildcards on either side and
/// ignoring parameters.
pub fn is_compatible(a: &Mime, b: &Mime) -> bool {
    let types = a.type_() == mime::STAR || b.type_() == mime::STAR || a.type_() == b.type_();
    let subtypes =
        a.subtype() == mime::STAR || b.subtype() == mime::STAR || a.subtype() == b.subtype();
    types && subtypes
}

/// Picks the more specific of two compatible types.
pub fn most_specific<'a>(a: &'a Mime, b: &'a Mime) -> &'a Mime {
    if specificity(b) > specificity(a) {
        b
    } else {
        a
    }
}

/// Parses an `Accept` header value.
///
/// A missing or empty header means `*/*`. Unparsable ranges are skipped.
/// Entries are returned best first.
pub fn parse_accept(value: Option<&str>) -> Vec<AcceptEntry> {
    let mut entries: Vec<AcceptEntry> = value
        .unwrap_or_default()
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let media: Mime = part.parse().ok()?;
            let quality = media
                .get_param("q")
                .map_or(1000, |q| parse_quality(q.as_str()));
            let range = format!("{}/{}", media.type_(), media.subtype())
                .parse()
                .ok()?;
            Some(AcceptEntry { range, quality })
        })
        .collect();

    if entries.is_empty() {
        entries.push(AcceptEntry {
            range: mime::STAR_STAR,
            quality: 1000,
        });
    }

    entries.sort_by(|a, b| {
        b.quality
            .cmp(&a.quality)
            .then_with(|| specificity(&b.range).cmp(&specificity(&a.range)))
    });
    entries
}

fn parse_quality(raw: &str) -> u16 {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|q| (0.0..=1.0).contains(q))
        .map_or(0, |q| {
            // bounded to 0..=1000 by the filter above
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let thousandths = (q * 1000.0).round() as u16;
            thousandths
        })
}

/// The `Accept` entries of a request.
pub fn accept_of(headers: &HeaderMap) -> Vec<AcceptEntry> {
    let joined = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    parse_accept(Some(&joined))
}

/// The parsed `Content-Type` of a request, if present and valid.
pub fn content_type_of(headers: &HeaderMap) -> Option<Mime> {
    headers
        .get(header::CONTENT_TYPE)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Scores the best pairing of `accept` with one of `produced`.
///
/// An empty `produced` list stands for `*/*`. Ranges with quality 0 never
/// match.
pub fn best_score(accept: &[AcceptEntry], produced: &[Mime]) -> Option<MatchScore> {
    negotiate_scored(accept, produced).map(|(score, _)| score)
}

/// Selects the media type to produce.
///
/// Returns the more specific side of the best pairing, which may still
/// contain wildcards when both sides do.
pub fn negotiate(accept: &[AcceptEntry], produced: &[Mime]) -> Option<Mime> {
    negotiate_scored(accept, produced).map(|(_, media)| media)
}

fn negotiate_scored(accept: &[AcceptEntry], produced: &[Mime]) -> Option<(MatchScore, Mime)> {
    let any = [mime::STAR_STAR];
    let produced = if produced.is_empty() { &any[..] } else { produced };

    let mut best: Option<(MatchScore, Mime)> = None;
    for entry in accept.iter().filter(|e| e.quality > 0) {
        for candidate in produced {
            if !is_compatible(&entry.range, candidate) {
                continue;
            }
            let media = most_specific(&entry.range, candidate);
            // a concrete type is weighed by the narrowest range covering it
            let weight = if is_wildcard(media) {
                entry
            } else {
                match governing_range(accept, media) {
                    Some(governing) if governing.quality > 0 => governing,
                    _ => continue,
                }
            };
            let score = MatchScore {
                quality: weight.quality,
                accept_specificity: specificity(&weight.range),
                produced_specificity: specificity(candidate),
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| score.cmp(current) == Ordering::Greater);
            if better {
                best = Some((score, media.clone()));
            }
        }
    }
    best
}

/// The most specific `Accept` range covering `media`. Among equally
/// specific ranges the first, and so the highest weighted, wins.
fn governing_range<'a>(accept: &'a [AcceptEntry], media: &Mime) -> Option<&'a AcceptEntry> {
    accept
        .iter()
        .filter(|e| is_compatible(&e.range, media))
        .fold(None, |best: Option<&AcceptEntry>, e| match best {
            Some(b) if specificity(&b.range) >= specificity(&e.range) => Some(b),
            _ => Some(e),
        })
}

/// Returns true if a resource consuming `consumes` accepts `content_type`.
/// An empty list consumes anything.
pub fn consumes(consumes: &[Mime], content_type: &Mime) -> bool {
    consumes.is_empty() || consumes.iter().any(|c| is_compatible(c, content_type))
}
