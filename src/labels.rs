//! Level and tier label codecs
//!
//! Building levels past 30 are shown in-game as `30-1`..`30-4` and then as
//! Fire Crystal levels `FC1`, `FC1-1`..`FC1-4`, `FC2`, .. `FC10`. Sheets keyed
//! only by a running level number use these helpers to recover the labels.

use std::sync::LazyLock;

use regex::Regex;

/// Highest running level with an in-game label.
pub const MAX_FC_ORDINAL: i64 = 80;

const FC_BASE: i64 = 35;
const FC_STEPS: i64 = 5;

static FC_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:FC(\d{1,2})|(\d{1,2}))(?:-([1-4]))?$").expect("valid FC label pattern"));

static GEAR_TIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Green|Blue|Purple|Gold|Legendary)(?: (T\d))?(?: (\d)\*)?$").expect("valid gear tier pattern")
});

/// In-game label for a running level number.
pub fn fc_label(ordinal: i64) -> Option<String> {
    match ordinal {
        1..=30 => Some(ordinal.to_string()),
        31..=34 => Some(format!("30-{}", ordinal - 30)),
        FC_BASE..=MAX_FC_ORDINAL => {
            let step = ordinal - FC_BASE;
            let (major, minor) = (step / FC_STEPS + 1, step % FC_STEPS);
            if minor == 0 {
                Some(format!("FC{}", major))
            } else {
                Some(format!("FC{}-{}", major, minor))
            }
        }
        _ => None,
    }
}

/// Running level number for an in-game label. Inverse of [`fc_label`].
pub fn fc_ordinal(label: &str) -> Option<i64> {
    let cap = FC_LABEL_RE.captures(label.trim())?;
    let minor: i64 = cap.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;

    let ordinal = if let Some(fc) = cap.get(1) {
        let major: i64 = fc.as_str().parse().ok()?;
        FC_BASE + (major - 1) * FC_STEPS + minor
    } else {
        let level: i64 = cap.get(2)?.as_str().parse().ok()?;
        level + minor
    };

    // Rejects forms like "12-3", "FC0" or "FC10-1".
    (fc_label(ordinal).as_deref() == Some(label.trim())).then_some(ordinal)
}

/// Korean display name of a gear tier, e.g. `Gold T1 2*` -> `레전드 T1 2성`.
///
/// Labels outside the known tier scheme are returned unchanged.
pub fn gear_tier_korean(label: &str) -> String {
    let Some(cap) = GEAR_TIER_RE.captures(label) else {
        return label.to_string();
    };

    let grade = match &cap[1] {
        "Green" => "고급",
        "Blue" => "레어",
        "Purple" => "에픽",
        "Gold" => "레전드",
        _ => "신화",
    };

    let mut out = grade.to_string();
    if let Some(t) = cap.get(2) {
        out.push(' ');
        out.push_str(t.as_str());
    }
    if let Some(stars) = cap.get(3) {
        out.push_str(&format!(" {}성", stars.as_str()));
    }
    out
}
