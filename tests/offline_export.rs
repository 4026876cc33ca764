use binaural_core::track::{BinauralParams, NoiseColor, NoiseParams};
use binaural_core::{CancelToken, EngineConfig, EngineError, ExportJob, OfflineRenderer, Session, TrackKind, TrackList};

fn two_track_list() -> TrackList {
    let mut list = TrackList::new();
    list.add(TrackKind::Binaural(BinauralParams {
        base_freq: 200.0,
        beat_freq: 10.0,
    }));
    list.add(TrackKind::Noise(NoiseParams {
        color: NoiseColor::Pink,
        low_cut: 100.0,
        high_cut: 8000.0,
    }));
    list
}

#[test]
fn five_second_two_track_export() {
    let config = EngineConfig::default();
    let mut renderer = OfflineRenderer::with_seed(&config, 11);
    let mut reports = 0;
    let audio = renderer
        .render(&two_track_list(), 5.0, &CancelToken::new(), |_, total| {
            assert_eq!(total, 5 * 44100);
            reports += 1;
        })
        .unwrap();

    assert_eq!(audio.frames(), 5 * 44100);
    assert_eq!(audio.right.len(), 5 * 44100);
    assert_eq!(reports, 5);
    assert!(
        audio.left.iter().chain(&audio.right).all(|s| (-1.0..=1.0).contains(s)),
        "export must stay within [-1, 1]"
    );
}

#[test]
fn export_is_deterministic_with_seed() {
    let config = EngineConfig {
        sample_rate: 8000,
        ..EngineConfig::default()
    };
    let list = two_track_list();
    let a = OfflineRenderer::with_seed(&config, 4)
        .render(&list, 1.5, &CancelToken::new(), |_, _| {})
        .unwrap();
    let b = OfflineRenderer::with_seed(&config, 4)
        .render(&list, 1.5, &CancelToken::new(), |_, _| {})
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn offline_does_not_disturb_live_phase() {
    let config = EngineConfig {
        sample_rate: 8000,
        block_size: 128,
        ..EngineConfig::default()
    };
    let session = Session::new();
    session.add_track(TrackKind::Binaural(BinauralParams::default()));

    let mut reference = binaural_core::RealtimeRenderer::with_seed(session.clone(), &config, 1);
    let mut live = binaural_core::RealtimeRenderer::with_seed(session.clone(), &config, 1);
    let mut expected = vec![0.0_f32; 512];
    let mut got = vec![0.0_f32; 512];

    reference.pull_interleaved(&mut expected);
    live.pull_interleaved(&mut got);

    OfflineRenderer::new(&config)
        .render(&session, 2.0, &CancelToken::new(), |_, _| {})
        .unwrap();

    reference.pull_interleaved(&mut expected);
    live.pull_interleaved(&mut got);
    assert_eq!(expected, got);
}

#[test]
fn cancelled_job_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cancelled.wav");
    let session = Session::new();
    session.add_track(TrackKind::Binaural(BinauralParams::default()));

    // Long enough that the worker cannot finish before the cancel lands.
    let job = ExportJob::spawn(session, EngineConfig::default(), 3600.0, path.clone()).unwrap();
    job.cancel();
    let result = job.join();

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn exported_wav_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.wav");
    let config = EngineConfig {
        sample_rate: 16000,
        ..EngineConfig::default()
    };
    let audio = OfflineRenderer::with_seed(&config, 2)
        .render(&two_track_list(), 1.0, &CancelToken::new(), |_, _| {})
        .unwrap();
    audio.write_wav(&path).unwrap();

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 16000);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert!(samples.iter().any(|&s| s != 0));
}
