use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use lookout::capture::{Decoder, DetectionResult, FrameMetadata, ReplayCamera, ScriptDecoder};
use lookout::display::Rect;
use lookout::error::{DecodeError, NotifyError};
use lookout::notify::{LogSink, NotificationSink, Notifier};
use lookout::pipeline::run_pipeline;
use lookout::{CaptureConfig, Config, DetectionConsumer, Frame, FrameAnalyzer, NotifyConfig, Rotation};

/// Decoder over plain text payloads: `fail` fails, anything else is one value
struct TextDecoder;

impl Decoder for TextDecoder {
    fn decode(
        &self,
        image: Bytes,
        _rotation: Rotation,
    ) -> impl Future<Output = Result<DetectionResult, DecodeError>> + Send {
        async move {
            tokio::task::yield_now().await;
            match &image[..] {
                b"fail" => Err(DecodeError::Malformed("unreadable".into())),
                value => Ok(vec![Some(String::from_utf8_lossy(value).into_owned())]),
            }
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    bodies: Mutex<Vec<String>>,
}

impl NotificationSink for RecordingSink {
    fn send(
        &self,
        _recipients: &[String],
        _subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        self.bodies.lock().unwrap().push(body.to_string());
        async { Ok(()) }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_frame_is_released_exactly_once() {
    const FRAMES: usize = 1000;
    let releases: Arc<Vec<AtomicUsize>> = Arc::new((0..FRAMES).map(|_| AtomicUsize::new(0)).collect());

    let (tx, rx) = flume::bounded(4);
    let consumer = DetectionConsumer::new(Notifier::new(Arc::new(LogSink), &NotifyConfig::default()));
    let consumer_task = tokio::spawn(consumer.run(rx));

    let mut analyzer = FrameAnalyzer::new(Arc::new(TextDecoder), tx);
    for i in 0..FRAMES {
        let payload = match i % 4 {
            0 => None,
            1 => Some(Bytes::from_static(b"fail")),
            2 => Some(Bytes::from_static(b"036000291452")),
            _ => Some(Bytes::from_static(b"4006381333931")),
        };
        let releases = releases.clone();
        let frame = Frame::new(
            payload,
            FrameMetadata {
                sequence: i as u64,
                width: 640,
                height: 480,
                rotation: Rotation::Deg0,
            },
        )
        .with_release(move |meta| {
            releases[meta.sequence as usize].fetch_add(1, Ordering::SeqCst);
        });
        analyzer.analyze(frame).await;
    }
    drop(analyzer);

    let stats = consumer_task.await.unwrap();
    assert!(releases.iter().all(|count| count.load(Ordering::SeqCst) == 1));
    assert_eq!(stats.frames_analyzed, 750);
    assert_eq!(stats.decode_failures, 250);
    // Every image frame alternates between the two values
    assert_eq!(stats.detections, 500);
}

#[tokio::test]
async fn replayed_scan_notifies_each_new_value() {
    let script = "\
036000291452
036000291452
-
!
4006381333931,4006381333931

036000291452
01234565
";
    let config = Config {
        capture: CaptureConfig {
            fps: 50,
            ..CaptureConfig::default()
        },
        notify: NotifyConfig {
            recipients: vec!["ops@example.com".into()],
            ..NotifyConfig::default()
        },
        ..Config::default()
    };
    let camera = ReplayCamera::from_script(script, config.capture.clone()).unwrap();
    let decoder = Arc::new(ScriptDecoder::new(config.capture.formats.clone()));
    let sink = Arc::new(RecordingSink::default());

    let report = run_pipeline(&config, camera, decoder, sink.clone()).await.unwrap();

    assert_eq!(report.stats.frames_captured, 8);
    assert_eq!(report.buffers_returned, 8);
    assert_eq!(report.stats.frames_dropped, 0);
    assert_eq!(report.stats.frames_analyzed, 7);
    assert_eq!(report.stats.decode_failures, 1);
    assert_eq!(report.stats.detections, 4);

    // Sends are fire-and-forget; give the spawned tasks a moment
    for _ in 0..100 {
        if sink.bodies.lock().unwrap().len() as u64 == report.stats.detections {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let bodies = sink.bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec!["036000291452", "4006381333931", "036000291452", "01234565"]
    );

    let overlay = &report.overlay;
    assert_eq!(overlay.geometry_recomputes(), 1);
    assert_eq!(overlay.view_rect(), Some(Rect::new(50.0, 470.0, 1030.0, 1450.0)));
    assert!(overlay.detection_active());
    assert!(!overlay.is_interactive());
}

#[tokio::test]
async fn without_drops_scan_matches_dedup_sequence() {
    // One frame at a time through the consumer, no camera pacing involved
    let decoder = ScriptDecoder::new(vec![lookout::Symbology::UpcA, lookout::Symbology::Ean13]);
    let mut consumer = DetectionConsumer::new(Notifier::new(Arc::new(LogSink), &NotifyConfig::default()));
    let mut fired = Vec::new();

    for (seq, text) in ["036000291452", "036000291452", "4006381333931", "036000291452"]
        .into_iter()
        .enumerate()
    {
        let frame = Frame::new(
            Some(Bytes::from_static(text.as_bytes())),
            FrameMetadata {
                sequence: seq as u64,
                width: 640,
                height: 480,
                rotation: Rotation::Deg90,
            },
        );
        let outcome = decoder.decode(Bytes::from_static(text.as_bytes()), Rotation::Deg90).await;
        let completion = lookout::pipeline::Completion { frame, outcome };
        fired.extend(consumer.handle(completion).into_iter().map(|e| e.value));
    }

    assert_eq!(fired, vec!["036000291452", "4006381333931", "036000291452"]);
}
