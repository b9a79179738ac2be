use ecofarm::{
    catalog::Biome,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    snapshot::SnapshotWriter,
    world::Farm,
};
use tempfile::tempdir;

#[test]
fn bundled_scenarios_build() {
    let loader = ScenarioLoader::new("scenarios");
    let valley = loader.load("kathmandu_valley.yaml").expect("valley loads");
    assert_eq!(valley.resolve_biome(), Biome::Hilly);
    let farm = valley.build_farm().expect("valley builds");
    assert_eq!(farm.planted_count(), 8);
    assert_eq!(farm.coins(), 1984);

    let drought = loader.load("terai_drought.yaml").expect("drought loads");
    assert_eq!(drought.resolve_biome(), Biome::Terai);
    let farm = drought.build_farm().expect("drought builds");
    assert_eq!(farm.environment().location, "Chitwan");
    assert_eq!(farm.alive_count(), 4);
}

#[test]
fn missing_scenario_reports_path() {
    let err = ScenarioLoader::new("scenarios")
        .load("nowhere.yaml")
        .expect_err("missing file");
    assert!(format!("{err:#}").contains("nowhere.yaml"));
}

#[test]
fn drought_scenario_loses_its_crops() {
    let scenario = ScenarioLoader::new("scenarios")
        .load("terai_drought.yaml")
        .expect("loads");
    let mut farm = scenario.build_farm().expect("builds");
    let temp = tempdir().expect("tempdir");
    let mut engine = EngineBuilder::new(EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: 0,
        snapshot_dir: temp.path().to_path_buf(),
        speed: scenario.speed,
    })
    .with_default_systems(scenario.alert_cooldown_ticks)
    .build();

    let executed = engine
        .run(&mut farm, scenario.ticks(None))
        .expect("run succeeds");
    assert_eq!(executed, 400);
    assert_eq!(farm.alive_count(), 0);
    assert_eq!(farm.coins(), 492 - 4 * 5);
}

#[test]
fn resumed_run_matches_continuous_run() {
    let scenario = ScenarioLoader::new("scenarios")
        .load("kathmandu_valley.yaml")
        .expect("loads");
    let temp = tempdir().expect("tempdir");
    let settings = || EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: 0,
        snapshot_dir: temp.path().to_path_buf(),
        speed: scenario.speed,
    };

    let mut continuous = scenario.build_farm().expect("builds");
    EngineBuilder::new(settings())
        .with_default_systems(30)
        .build()
        .run(&mut continuous, 300)
        .expect("run");

    let mut first = scenario.build_farm().expect("builds");
    EngineBuilder::new(settings())
        .with_default_systems(30)
        .build()
        .run(&mut first, 120)
        .expect("run");
    let path = SnapshotWriter::new(temp.path(), 1)
        .write(&first, &scenario.name)
        .expect("snapshot");
    let file = ecofarm::snapshot::load(&path).expect("loads");
    let mut resumed = Farm::restore(&file.farm).expect("restores");
    EngineBuilder::new(settings())
        .with_default_systems(30)
        .build()
        .run(&mut resumed, 180)
        .expect("run");

    assert_eq!(resumed.tick(), continuous.tick());
    assert_eq!(resumed.day(), continuous.day());
    assert_eq!(resumed.coins(), continuous.coins());
    for index in 0..16 {
        let (a, b) = (resumed.crop(index), continuous.crop(index));
        assert_eq!(a.map(|crop| crop.is_dead), b.map(|crop| crop.is_dead));
        if let (Some(a), Some(b)) = (a, b) {
            assert!((a.growth_days - b.growth_days).abs() < 1e-9);
            assert!((a.health - b.health).abs() < 1e-9);
        }
    }
}
