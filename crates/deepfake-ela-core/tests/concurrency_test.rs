//! Concurrent classification against one shared detector.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};

use deepfake_ela_core::{
    Classifier, ClassifierError, Detector, DetectorConfig, ExclusiveClassifier, NormalizedTensor,
    ScratchMode, VerdictRecord,
};

/// Output depends on the input, so crossed wires show up as wrong scores.
struct MeanIntensity {
    calls: AtomicUsize,
}

impl Classifier for MeanIntensity {
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<Vec<f32>>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let values = input.as_slice();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        Ok(vec![vec![1.0 - mean, mean]])
    }
}

fn image_bytes(seed: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(96 + seed * 8, 72 + seed * 4, |x, y| {
        let v = ((x * (seed + 3) + y * (2 * seed + 1)) % 256) as u8;
        Rgb([v, v.wrapping_mul(3), 255 - v])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn disk_config(dir: &std::path::Path) -> DetectorConfig {
    let mut config = DetectorConfig::default();
    config.ela.scratch = ScratchMode::Disk;
    config.ela.scratch_dir = Some(dir.to_path_buf());
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_classifications_do_not_interfere() {
    let scratch = tempfile::tempdir().unwrap();
    let classifier = Arc::new(MeanIntensity {
        calls: AtomicUsize::new(0),
    });
    let detector = Detector::with_classifier(classifier.clone(), &disk_config(scratch.path()))
        .unwrap();

    let inputs: Vec<(String, Vec<u8>)> = (0..8)
        .map(|i| (format!("image-{}.png", i), image_bytes(i)))
        .collect();

    // Sequential reference results
    let expected: Vec<VerdictRecord> = inputs
        .iter()
        .map(|(name, bytes)| detector.classify(bytes, name).unwrap())
        .collect();

    let handles: Vec<_> = inputs
        .iter()
        .cloned()
        .map(|(name, bytes)| {
            let detector = detector.clone();
            tokio::task::spawn_blocking(move || detector.classify(&bytes, &name))
        })
        .collect();

    for (handle, want) in handles.into_iter().zip(expected.iter()) {
        let got = handle.await.unwrap().unwrap();
        assert_eq!(got.file, want.file);
        assert_eq!(got, *want);
    }

    assert_eq!(classifier.calls.load(Ordering::SeqCst), 16);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_concurrent_calls_keep_their_filenames() {
    let detector = Detector::with_classifier(
        Arc::new(MeanIntensity {
            calls: AtomicUsize::new(0),
        }),
        &DetectorConfig::default(),
    )
    .unwrap();

    let a = {
        let detector = detector.clone();
        tokio::task::spawn_blocking(move || detector.classify(&image_bytes(1), "first.png"))
    };
    let b = {
        let detector = detector.clone();
        tokio::task::spawn_blocking(move || detector.classify(&image_bytes(2), "second.png"))
    };

    let (a, b) = tokio::join!(a, b);
    assert_eq!(a.unwrap().unwrap().file, "first.png");
    assert_eq!(b.unwrap().unwrap().file, "second.png");
}

#[test]
fn test_exclusive_classifier_under_threads() {
    let inner = MeanIntensity {
        calls: AtomicUsize::new(0),
    };
    let detector = Detector::with_classifier(
        Arc::new(ExclusiveClassifier::new(inner)),
        &DetectorConfig::default(),
    )
    .unwrap();

    std::thread::scope(|s| {
        for i in 0..6 {
            let detector = &detector;
            s.spawn(move || {
                let name = format!("t{}.png", i);
                let verdict = detector.classify(&image_bytes(i), &name).unwrap();
                assert_eq!(verdict.file, name);
                assert!(verdict.probabilities.is_distribution());
            });
        }
    });
}
