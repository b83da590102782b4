/*!
 * Tests for SRT reading, writing and windowing
 */

use anyhow::Result;
use srtai::subtitle_processor::{SubtitleCollection, SubtitleEntry, SubtitleInfo};

use crate::common;

#[test]
fn test_loadSrt_withFiveEntries_shouldKeepTextAndTiming() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;

    let subtitles = SubtitleCollection::load_srt(&path)?;

    assert_eq!(subtitles.len(), 5);
    assert_eq!(subtitles.source_file, path);
    assert_eq!(subtitles.entries[0].start_time_ms, 1_000);
    assert_eq!(subtitles.entries[0].end_time_ms, 2_500);
    assert_eq!(subtitles.entries[2].text, "To the market,\nlike every day.");
    assert_eq!(subtitles.entries[4].text, "<i>Goodbye!</i>");
    assert!(subtitles.entries.iter().all(|e| e.translated_text.is_none()));
    Ok(())
}

#[test]
fn test_parseSrtString_withBomAndDotMillis_shouldParse() -> Result<()> {
    let content = "\u{feff}1\n00:00:01.000 --> 00:00:02.000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n";

    let entries = SubtitleCollection::parse_srt_string(content)?;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq_num, 1);
    assert_eq!(entries[0].text, "Hello");
    assert_eq!(entries[1].start_time_ms, 3_000);
    Ok(())
}

#[test]
fn test_parseSrtString_withOutOfOrderEntries_shouldKeepFileOrderAndRenumber() -> Result<()> {
    let content = "7\n00:00:05,000 --> 00:00:06,000\nLater\n\n3\n00:00:01,000 --> 00:00:02,000\nEarlier\n";

    let entries = SubtitleCollection::parse_srt_string(content)?;

    assert_eq!(entries[0].text, "Later");
    assert_eq!(entries[1].text, "Earlier");
    assert_eq!(entries.iter().map(|e| e.seq_num).collect::<Vec<_>>(), vec![1, 2]);
    Ok(())
}

#[test]
fn test_parseSrtString_withInvalidBlock_shouldSkipIt() -> Result<()> {
    let content = "1\n00:00:05,000 --> 00:00:04,000\nBackwards\n\n2\n00:00:06,000 --> 00:00:07,000\nFine\n";

    let entries = SubtitleCollection::parse_srt_string(content)?;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Fine");
    Ok(())
}

#[test]
fn test_parseSrtString_withNoEntries_shouldFail() {
    assert!(SubtitleCollection::parse_srt_string("just some text\n").is_err());
}

#[test]
fn test_parseTimestamp_shouldHandleBothSeparators() -> Result<()> {
    assert_eq!(SubtitleEntry::parse_timestamp("01:02:03,456")?, 3_723_456);
    assert_eq!(SubtitleEntry::parse_timestamp("00:00:01.500")?, 1_500);
    assert!(SubtitleEntry::parse_timestamp("00:61:00,000").is_err());
    assert!(SubtitleEntry::parse_timestamp("garbage").is_err());
    Ok(())
}

#[test]
fn test_formatTimestamp_shouldPadFields() {
    assert_eq!(SubtitleEntry::format_timestamp(3_723_456), "01:02:03,456");
    assert_eq!(SubtitleEntry::format_timestamp(0), "00:00:00,000");
}

#[test]
fn test_splitIntoWindows_shouldPartitionInOrder() -> Result<()> {
    let subtitles = SubtitleCollection::from_entries(
        "in.srt".into(),
        SubtitleCollection::parse_srt_string(common::FIVE_ENTRY_SRT)?,
    );

    assert_eq!(subtitles.split_into_windows(2), vec![0..2, 2..4, 4..5]);
    assert_eq!(subtitles.split_into_windows(5), vec![0..5]);
    assert_eq!(subtitles.split_into_windows(10), vec![0..5]);
    assert_eq!(subtitles.split_into_windows(1).len(), 5);
    Ok(())
}

#[test]
fn test_splitIntoWindows_withEmptyCollection_shouldYieldNothing() {
    let subtitles = SubtitleCollection::new("empty.srt".into());
    assert!(subtitles.split_into_windows(3).is_empty());
}

#[test]
fn test_applyTranslations_shouldOnlyTouchTheWindow() -> Result<()> {
    let mut subtitles = SubtitleCollection::from_entries(
        "in.srt".into(),
        SubtitleCollection::parse_srt_string(common::FIVE_ENTRY_SRT)?,
    );

    subtitles.apply_translations(2..4, vec!["Au marché,\ncomme chaque jour.".to_string(), "Apporte du pain.".to_string()])?;

    assert!(subtitles.entries[1].translated_text.is_none());
    assert_eq!(subtitles.entries[2].output_text(), "Au marché,\ncomme chaque jour.");
    assert_eq!(subtitles.entries[3].output_text(), "Apporte du pain.");
    assert_eq!(subtitles.entries[4].output_text(), "<i>Goodbye!</i>");

    assert!(subtitles.apply_translations(0..2, vec!["only one".to_string()]).is_err());
    assert!(subtitles.apply_translations(4..6, vec!["a".to_string(), "b".to_string()]).is_err());
    Ok(())
}

#[test]
fn test_toSrtString_shouldRoundTripTimingWithTranslations() -> Result<()> {
    let mut subtitles = SubtitleCollection::from_entries(
        "in.srt".into(),
        SubtitleCollection::parse_srt_string(common::FIVE_ENTRY_SRT)?,
    );
    subtitles.apply_translations(0..1, vec!["Bonjour.".to_string()])?;

    let rendered = subtitles.to_srt_string();
    let reparsed = SubtitleCollection::parse_srt_string(&rendered)?;

    assert!(rendered.starts_with("1\n00:00:01,000 --> 00:00:02,500\nBonjour.\n\n"));
    assert_eq!(reparsed.len(), subtitles.len());
    for (a, b) in reparsed.iter().zip(&subtitles.entries) {
        assert_eq!(a.start_time_ms, b.start_time_ms);
        assert_eq!(a.end_time_ms, b.end_time_ms);
        assert_eq!(a.text, b.output_text());
    }
    Ok(())
}

#[test]
fn test_parseFfprobeStreams_shouldReadTagsAndCodec() -> Result<()> {
    let json = r#"{"streams":[
        {"index":2,"codec_name":"subrip","tags":{"language":"eng","title":"Full"}},
        {"index":3,"codec_name":"hdmv_pgs_subtitle","tags":{"language":"fre"}},
        {"codec_name":"ass"}
    ]}"#;

    let tracks = SubtitleCollection::parse_ffprobe_streams(json)?;

    assert_eq!(tracks.len(), 2);
    assert_eq!(
        tracks[0],
        SubtitleInfo {
            index: 2,
            codec_name: "subrip".to_string(),
            language: Some("eng".to_string()),
            title: Some("Full".to_string()),
        }
    );
    assert!(tracks[1].is_bitmap());
    assert!(SubtitleCollection::parse_ffprobe_streams("")?.is_empty());
    assert!(SubtitleCollection::parse_ffprobe_streams("not json").is_err());
    Ok(())
}

#[test]
fn test_toSrtString_withBlankLineInTranslation_shouldStayOneEntry() -> Result<()> {
    let mut subtitles = SubtitleCollection::from_entries(
        "in.srt".into(),
        SubtitleCollection::parse_srt_string(common::FIVE_ENTRY_SRT)?,
    );
    subtitles.apply_translations(0..2, vec!["Bonjour\n\n42".to_string(), "Salut\n   \nà tous".to_string()])?;

    let rendered = subtitles.to_srt_string();
    let reparsed = SubtitleCollection::parse_srt_string(&rendered)?;

    assert!(rendered.starts_with("1\n00:00:01,000 --> 00:00:02,500\nBonjour\n42\n\n2\n"));
    assert_eq!(reparsed.len(), subtitles.len());
    assert_eq!(reparsed[0].text, "Bonjour\n42");
    assert_eq!(reparsed[1].text, "Salut\nà tous");
    assert_eq!(reparsed[2].text, "To the market,\nlike every day.");
    Ok(())
}
