use recon_data::{ImagePose, write_pose_file};
use recon_pipeline::quality::{
    BestResultSelector, ComparisonReport, Quality, QualityGate, ResultSource, discover_scenes, pose_file_path,
    read_scene_list, write_scene_list,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_scene(root: &Path, scene: &str, registered: u32, marker: &str) {
    let scene_dir = root.join(scene);
    let pose_file = pose_file_path(&scene_dir);
    fs::create_dir_all(pose_file.parent().unwrap()).unwrap();
    let poses: Vec<ImagePose> = (1..=registered)
        .map(|i| ImagePose::new(i, Default::default(), Default::default(), 1, format!("{i:06}.png")))
        .collect();
    write_pose_file(&pose_file, &poses).unwrap();
    fs::write(scene_dir.join("database.db"), marker).unwrap();
}

#[test]
fn combine_picks_best_and_persists_good_scenes() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("baseline");
    let robust = dir.path().join("robust");
    let combined = dir.path().join("combined");

    write_scene(&baseline, "scene0001_00", 30, "baseline");
    write_scene(&robust, "scene0001_00", 12, "robust");
    write_scene(&baseline, "scene0002_00", 10, "baseline");
    write_scene(&robust, "scene0002_00", 10, "robust");
    write_scene(&baseline, "scene0003_00", 5, "baseline");
    write_scene(&robust, "scene0003_00", 40, "robust");
    write_scene(&robust, "scene0004_00", 18, "robust");

    let selector = BestResultSelector::new(
        ResultSource::new("ORIG", &baseline),
        ResultSource::new("ROBUST", &robust),
        &combined,
    );
    let scenes = discover_scenes(&robust, "scene").unwrap();
    let summary = selector.combine_all(&scenes).unwrap();

    let winners: Vec<(&str, &str)> = summary
        .results
        .iter()
        .map(|r| (r.scene_id.as_str(), r.winner.tag.as_str()))
        .collect();
    assert_eq!(
        winners,
        vec![
            ("scene0001_00", "ORIG"),
            ("scene0002_00", "ORIG"),
            ("scene0003_00", "ROBUST"),
            ("scene0004_00", "ROBUST"),
        ]
    );
    assert_eq!(summary.picks["ORIG"], 2);
    assert_eq!(summary.picks["ROBUST"], 2);
    assert_eq!(summary.good_scenes, vec!["scene0001_00", "scene0003_00"]);
    assert_eq!(summary.results[3].quality, Quality::Marginal);

    assert_eq!(fs::read_to_string(combined.join("scene0002_00/database.db")).unwrap(), "baseline");
    assert_eq!(fs::read_to_string(combined.join("scene0003_00/database.db")).unwrap(), "robust");
    let gate = QualityGate::default();
    assert_eq!(gate.scene_count(&combined.join("scene0003_00")).unwrap(), 40);

    let list = dir.path().join("good_scenes_combined.txt");
    write_scene_list(&list, &summary.good_scenes).unwrap();
    assert_eq!(read_scene_list(&list).unwrap(), summary.good_scenes);
}

#[test]
fn combine_overwrites_previous_copy() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("baseline");
    let robust = dir.path().join("robust");
    let combined = dir.path().join("combined");
    write_scene(&baseline, "scene", 3, "baseline");
    write_scene(&robust, "scene", 4, "robust");

    fs::create_dir_all(combined.join("scene")).unwrap();
    fs::write(combined.join("scene/stale.txt"), "old").unwrap();

    let selector = BestResultSelector::new(
        ResultSource::new("ORIG", &baseline),
        ResultSource::new("ROBUST", &robust),
        &combined,
    );
    let result = selector.combine_scene("scene").unwrap();

    assert!(result.copied);
    assert_eq!(result.winner.tag, "ROBUST");
    assert!(!combined.join("scene/stale.txt").exists());
    assert!(pose_file_path(&combined.join("scene")).is_file());
}

#[test]
fn scene_missing_everywhere_is_not_copied() {
    let dir = TempDir::new().unwrap();
    let selector = BestResultSelector::new(
        ResultSource::new("ORIG", dir.path().join("a")),
        ResultSource::new("ROBUST", dir.path().join("b")),
        dir.path().join("combined"),
    );
    let result = selector.combine_scene("scene").unwrap();
    assert_eq!(result.winner.tag, "ORIG");
    assert_eq!(result.quality, Quality::Failed);
    assert!(!result.copied);
}

#[test]
fn comparison_report_over_result_roots() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("baseline");
    let robust = dir.path().join("robust");
    write_scene(&baseline, "scene_a", 8, "b");
    write_scene(&robust, "scene_a", 27, "r");
    write_scene(&baseline, "scene_b", 20, "b");
    write_scene(&robust, "scene_b", 14, "r");

    let scenes = discover_scenes(&robust, "scene").unwrap();
    let report = ComparisonReport::build(&QualityGate::default(), &baseline, &robust, &scenes).unwrap();
    assert_eq!(report.good_scene_ids(), vec!["scene_a"]);
    assert_eq!(report.entries[1].baseline, 20);
    assert_eq!(report.entries[1].robust, 14);
}
