//! Model codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tradfri_core::{codec, IpsoObjectExt};
use tradfri_devices::{Accessory, Light, Scene};

const ACCESSORY: &[u8] = br#"{
    "9001": "Desk lamp", "9003": 65537, "9002": 1500000000, "9019": 1, "9020": 1500000100,
    "5750": 2,
    "3": {"0": "IKEA of Sweden", "1": "TRADFRI bulb E27 CWS opal 600lm", "3": "1.3.002", "6": 1},
    "3311": [{"9003": 0, "5850": 1, "5851": 254, "5707": 32640, "5708": 50000,
              "5709": 30140, "5710": 26909, "5712": 5, "5706": "f1e0b5"}]
}"#;

const SCENE: &[u8] = br#"{
    "9001": "Relax", "9003": 196608, "9057": 2,
    "15013": [
        {"9003": 65537, "5850": 1, "5851": 80},
        {"9003": 65538, "5850": 1, "5851": 120},
        {"9003": 65539, "5850": 0}
    ]
}"#;

fn parse_benchmark(c: &mut Criterion) {
    let raw = codec::decode(ACCESSORY).unwrap();

    c.bench_function("parse_accessory", |b| {
        b.iter(|| black_box(Accessory::from_wire(black_box(&raw))))
    });
}

fn serialize_benchmark(c: &mut Criterion) {
    let accessory = Accessory::from_wire(&codec::decode(ACCESSORY).unwrap());
    let light = accessory.first_light().unwrap().clone();
    let reference = Light::default();

    c.bench_function("serialize_light_full", |b| {
        b.iter(|| black_box(light.serialize().unwrap()))
    });

    c.bench_function("serialize_light_against_defaults", |b| {
        b.iter(|| black_box(light.serialize_against(&reference).unwrap()))
    });
}

fn scene_diff_benchmark(c: &mut Criterion) {
    let original = Scene::default().parsed(&codec::decode(SCENE).unwrap());
    let mut changed = original.clone();
    if let Some(settings) = changed.light_settings.as_mut() {
        settings[1].dimmer = 10;
    }

    c.bench_function("serialize_scene_diff", |b| {
        b.iter(|| black_box(changed.serialize_against(&original).unwrap()))
    });
}

criterion_group!(benches, parse_benchmark, serialize_benchmark, scene_diff_benchmark);
criterion_main!(benches);
