// Unicode utilities for text handling
use icu_collator::{Collator, CollatorOptions};
use std::cmp::Ordering;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// 文字列を指定された表示幅に切り詰め（Unicode文字境界と表示幅を考慮）
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    if s.width() <= max_width {
        return s.to_string();
    }

    let target_width = max_width - 3; // "..."の表示幅
    let mut accumulated_width = 0;
    let mut result = String::new();

    for grapheme in s.graphemes(true) {
        let grapheme_width = grapheme.width();
        if accumulated_width + grapheme_width > target_width {
            break;
        }
        result.push_str(grapheme);
        accumulated_width += grapheme_width;
    }

    format!("{result}...")
}

/// 表示幅に合わせて右側を空白で埋める
pub fn pad_to_width(s: &str, width: usize) -> String {
    let current = s.width();
    if current >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - current))
}

thread_local! {
    static COLLATOR: Option<Collator> =
        Collator::try_new(&Default::default(), CollatorOptions::new()).ok();
}

/// ロケール照合順の比較（ルートロケール）
///
/// 照合上は同じでも異なる文字列はコードポイント順で決める。
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}
