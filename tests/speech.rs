//! Speaker integration tests
//!
//! Drives the speaker task with a scripted driver, no audio hardware needed

use std::sync::Arc;
use std::time::Duration;

use talkback::speech::{Speaker, SpeechDriver, SystemDriver, Voice};

mod common;

use common::{ScriptedDriver, speech_config};

#[tokio::test]
async fn test_speaks_all_chunks_in_order() {
    let driver = Arc::new(ScriptedDriver::new());
    let speaker = Speaker::new(driver.clone(), &speech_config(10)).spawn();

    speaker.speak("the quick brown fox jumps over").unwrap();
    speaker.drained().await.unwrap();

    assert_eq!(
        driver.finished_texts(),
        vec!["the quick", "brown fox", "jumps over"]
    );
}

#[tokio::test]
async fn test_first_utterance_finishes_before_second() {
    let driver = Arc::new(ScriptedDriver::new());
    let speaker = Speaker::new(driver.clone(), &speech_config(5)).spawn();

    speaker.speak("one two three").unwrap();
    speaker.speak("four five").unwrap();
    speaker.drained().await.unwrap();

    assert_eq!(
        driver.started_texts(),
        vec!["one", "two", "three", "four", "five"]
    );
    assert_eq!(driver.max_active(), 1);
}

#[tokio::test]
async fn test_next_chunk_waits_for_completion() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(3)).spawn();

    speaker.speak("aaa bbb ccc").unwrap();
    driver.wait_for_started(1).await;

    // Give the speaker a chance to misbehave
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(driver.started_texts(), vec!["aaa"]);

    driver.release(1);
    driver.wait_for_started(2).await;
    assert_eq!(driver.started_texts(), vec!["aaa", "bbb"]);

    driver.release(2);
    speaker.drained().await.unwrap();
    assert_eq!(driver.finished_texts(), vec!["aaa", "bbb", "ccc"]);
    assert_eq!(driver.max_active(), 1);
}

#[tokio::test]
async fn test_driver_error_does_not_stop_queue() {
    let driver = Arc::new(ScriptedDriver::new().failing_on("bbb"));
    let speaker = Speaker::new(driver.clone(), &speech_config(3)).spawn();

    speaker.speak("aaa bbb ccc").unwrap();
    speaker.speak("ddd").unwrap();
    speaker.drained().await.unwrap();

    assert_eq!(driver.started_texts(), vec!["aaa", "bbb", "ccc", "ddd"]);
}

#[tokio::test]
async fn test_clear_discards_pending_utterances() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(200)).spawn();

    speaker.speak("first").unwrap();
    driver.wait_for_started(1).await;
    speaker.speak("second").unwrap();
    speaker.speak("third").unwrap();
    speaker.clear().unwrap();

    // The in-flight chunk finishing must not revive cleared texts
    driver.release(1);
    speaker.drained().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(driver.started_texts(), vec!["first"]);
}

#[tokio::test]
async fn test_stale_completion_does_not_advance_new_utterance() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(3)).spawn();

    speaker.speak("old").unwrap();
    driver.wait_for_started(1).await;

    speaker.clear().unwrap();
    speaker.speak("aaa bbb").unwrap();
    // The queue hands "aaa" over at once; real drivers hold it until "old" ends
    driver.wait_for_started(2).await;
    assert_eq!(driver.started_texts(), vec!["old", "aaa"]);

    // "old" was waiting first, so it takes this permit
    driver.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(driver.finished_texts(), vec!["old"]);
    assert_eq!(driver.started_texts(), vec!["old", "aaa"]);

    driver.release(1);
    driver.wait_for_started(3).await;
    assert_eq!(driver.started_texts(), vec!["old", "aaa", "bbb"]);

    driver.release(1);
    speaker.drained().await.unwrap();
}

#[tokio::test]
async fn test_selects_voice_by_language() {
    let driver = Arc::new(ScriptedDriver::new().with_voices(vec![
        Voice::new("Bob", "fr"),
        Voice::new("Jane", "en-GB"),
    ]));
    let speaker = Speaker::new(driver.clone(), &speech_config(200)).spawn();

    let selected = speaker.selected_voice().await.unwrap();
    assert_eq!(selected.map(|v| v.name), Some("Jane".to_string()));

    speaker.speak("hello").unwrap();
    speaker.drained().await.unwrap();
    assert_eq!(driver.started()[0].voice.as_deref(), Some("Jane"));
}

#[tokio::test]
async fn test_prefers_named_voice() {
    let driver = Arc::new(ScriptedDriver::new().with_voices(vec![
        Voice::new("Jane", "en-GB"),
        Voice::new("Google US English", "en-US"),
    ]));
    let speaker = Speaker::new(driver, &speech_config(200)).spawn();

    let selected = speaker.selected_voice().await.unwrap();
    assert_eq!(
        selected.map(|v| v.name),
        Some("Google US English".to_string())
    );
}

#[tokio::test]
async fn test_no_voices_uses_driver_default() {
    let driver = Arc::new(ScriptedDriver::new());
    let speaker = Speaker::new(driver.clone(), &speech_config(200)).spawn();

    speaker.speak("hello").unwrap();
    speaker.drained().await.unwrap();

    assert!(speaker.selected_voice().await.unwrap().is_none());
    assert_eq!(driver.started()[0].voice, None);
}

#[tokio::test]
async fn test_retries_empty_voice_list_once() {
    let driver = Arc::new(
        ScriptedDriver::new()
            .with_voice_sequence(vec![Vec::new(), vec![Voice::new("Jane", "en-GB")]]),
    );
    let speaker = Speaker::new(driver, &speech_config(200)).spawn();

    assert!(speaker.selected_voice().await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let selected = speaker.selected_voice().await.unwrap();
    assert_eq!(selected.map(|v| v.name), Some("Jane".to_string()));
}

#[tokio::test]
async fn test_refresh_voices_reruns_selection() {
    let driver = Arc::new(ScriptedDriver::new().with_voice_sequence(vec![
        vec![Voice::new("Bob", "fr")],
        vec![Voice::new("Bob", "fr"), Voice::new("Jane", "en-GB")],
    ]));
    let speaker = Speaker::new(driver, &speech_config(200)).spawn();

    let first = speaker.selected_voice().await.unwrap();
    assert_eq!(first.map(|v| v.name), Some("Bob".to_string()));

    speaker.refresh_voices().unwrap();
    let refreshed = speaker.selected_voice().await.unwrap();
    assert_eq!(refreshed.map(|v| v.name), Some("Jane".to_string()));
    assert_eq!(speaker.voices().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_manual_voice_applies_to_next_chunk() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(3)).spawn();

    speaker.speak("aaa bbb").unwrap();
    driver.wait_for_started(1).await;
    speaker.set_voice(Some(Voice::new("Jane", "en-GB"))).unwrap();

    driver.release(2);
    speaker.drained().await.unwrap();

    let started = driver.started();
    assert_eq!(started[0].voice, None);
    assert_eq!(started[1].voice.as_deref(), Some("Jane"));
}

#[tokio::test]
async fn test_clone_keeps_speaker_running() {
    let driver = Arc::new(ScriptedDriver::new());
    let speaker = Speaker::new(driver, &speech_config(200)).spawn();
    let clone = speaker.clone();
    drop(speaker);

    // A live clone keeps the task running
    clone.speak("still here").unwrap();
    clone.drained().await.unwrap();
}

#[tokio::test]
async fn test_stop_cancels_driver_before_returning() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(3)).spawn();

    speaker.speak("aaa bbb ccc").unwrap();
    driver.wait_for_started(1).await;

    speaker.stop().await.unwrap();
    assert_eq!(driver.cancels(), 1);

    driver.release(1);
    speaker.drained().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(driver.started_texts(), vec!["aaa"]);
}

#[tokio::test]
async fn test_speaks_again_after_stop() {
    let driver = Arc::new(ScriptedDriver::gated());
    let speaker = Speaker::new(driver.clone(), &speech_config(200)).spawn();

    speaker.speak("interrupted").unwrap();
    driver.wait_for_started(1).await;
    speaker.stop().await.unwrap();

    speaker.speak("next").unwrap();
    driver.wait_for_started(2).await;
    driver.release(2);
    speaker.drained().await.unwrap();

    assert_eq!(driver.started_texts(), vec!["interrupted", "next"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_system_driver_plays_overlapping_chunks_in_turn() {
    let command = common::LoggingCommand::new("serial");
    let driver = SystemDriver::new(command.command());

    let (first, second) = tokio::join!(driver.speak("one", None), driver.speak("two", None));
    first.unwrap();
    second.unwrap();

    assert_eq!(command.log(), vec!["start one", "end one", "start two", "end two"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_chunk_after_clear_waits_for_audio_in_flight() {
    let command = common::LoggingCommand::new("clear");
    let driver = Arc::new(SystemDriver::new(command.command()));
    let speaker = Speaker::new(driver, &speech_config(200)).spawn();

    speaker.speak("old").unwrap();
    command.wait_for("start old").await;

    speaker.clear().unwrap();
    speaker.speak("new").unwrap();
    speaker.drained().await.unwrap();
    command.wait_for("end new").await;

    assert_eq!(command.log(), vec!["start old", "end old", "start new", "end new"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_system_driver_cancel_stops_playing_and_waiting_chunks() {
    let command = common::LoggingCommand::new("cancel");
    let driver = SystemDriver::new(command.command());

    let (first, second, ()) = tokio::join!(
        driver.speak("one", None),
        driver.speak("two", None),
        async {
            command.wait_for("start one").await;
            driver.cancel().await.unwrap();
        }
    );
    first.unwrap();
    second.unwrap();

    // Long enough for a surviving command to log its end
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(command.log(), vec!["start one"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_stop_cuts_off_system_speech() {
    let command = common::LoggingCommand::new("stop");
    let driver = Arc::new(SystemDriver::new(command.command()));
    let speaker = Speaker::new(driver, &speech_config(3)).spawn();

    speaker.speak("aaa bbb").unwrap();
    command.wait_for("start aaa").await;
    speaker.stop().await.unwrap();
    speaker.drained().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(command.log(), vec!["start aaa"]);
}
