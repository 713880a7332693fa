use std::sync::Arc;

use serde_json::json;
use weft_api_core::{
    AttributeData, BufferAttribute, DisplayPayload, Drawable, Geometry, Material, MaterialKind,
    Overlay, Payload, PrimitiveKind, SceneNode, Transform,
};
use weft_scene_core::{deserialize, serialize, CodecError, FlatNodeKind, SerializedDisplay, TransferBuffer};

fn cube_geometry() -> Geometry {
    let positions: Vec<f32> = (0..8)
        .flat_map(|i| {
            [
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            ]
        })
        .collect();
    let mut geometry =
        Geometry::with_positions(positions).with_index(vec![0, 1, 3, 0, 3, 2, 4, 6, 7, 4, 7, 5]);
    geometry.attributes.insert(
        "color".into(),
        BufferAttribute {
            data: AttributeData::U8((0..24).collect()),
            item_size: 3,
            normalized: true,
        },
    );
    geometry
}

fn sample() -> DisplayPayload {
    let material = Material {
        kind: MaterialKind::Standard,
        color: [0.2, 0.4, 0.6],
        opacity: 0.5,
        wireframe: false,
        size: None,
    };
    let mesh = Drawable {
        primitive: PrimitiveKind::Mesh,
        geometry: Arc::new(cube_geometry()),
        material,
    };
    let mut matrix = [0.0; 16];
    matrix[0] = 2.0;
    matrix[5] = 2.0;
    matrix[10] = 2.0;
    matrix[12] = 1.25;
    matrix[15] = 1.0;

    let mut root = SceneNode::group("display");
    let mut group = SceneNode::group("group").with_transform(Transform {
        position: [1.0, -2.0, 3.5],
        rotation: [0.0, 0.7071067811865476, 0.0, 0.7071067811865476],
        scale: [1.0, 0.5, 2.0],
        matrix: None,
    });
    group.push_child(SceneNode::drawable("cube", mesh).with_transform(Transform::from_matrix(matrix)));
    root.push_child(group);
    root.push_child(SceneNode {
        name: "marker".into(),
        transform: Transform::IDENTITY,
        payload: Some(Payload::Custom {
            data: json!({ "label": "origin", "size": 3 }),
        }),
        children: vec![],
    });

    DisplayPayload {
        scene: root,
        overlay: Overlay {
            points: vec![[0.1, 0.2, 0.3], [-1.0, 1e-9, 1e12]],
            segments: vec![[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]],
        },
    }
}

fn cube(payload: &DisplayPayload) -> &Drawable {
    match &payload.scene.children[0].children[0].payload {
        Some(Payload::Drawable(d)) => d,
        other => panic!("expected drawable, got {other:?}"),
    }
}

#[test]
fn round_trip_is_exact() {
    let original = sample();
    let (flat, buffers) = serialize(&original);
    let restored = deserialize(&flat, &buffers).expect("deserialize");
    assert_eq!(restored, original);

    let drawable = cube(&restored);
    assert_eq!(drawable.geometry.vertex_count(), 8);
    let index = drawable.geometry.index.as_ref().expect("index");
    assert_eq!(index.data.len(), 12);
    assert_eq!(index.data, cube(&original).geometry.index.as_ref().expect("index").data);
    assert!(!Arc::ptr_eq(&drawable.geometry, &cube(&original).geometry));
}

#[test]
fn transform_representation_is_preserved() {
    let original = sample();
    let (flat, buffers) = serialize(&original);
    let group = &flat.nodes[1];
    assert!(group.transform.decomposed);
    let cube_node = &flat.nodes[2];
    assert!(!cube_node.transform.decomposed);
    assert_eq!(cube_node.transform.position, [1.25, 0.0, 0.0]);

    let restored = deserialize(&flat, &buffers).expect("deserialize");
    assert!(restored.scene.children[0].transform.is_decomposed());
    assert_eq!(
        restored.scene.children[0].children[0].transform.matrix,
        original.scene.children[0].children[0].transform.matrix
    );
}

#[test]
fn flat_description_survives_json() {
    let original = sample();
    let (flat, buffers) = serialize(&original);
    let text = serde_json::to_string(&flat).expect("to json");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["nodes"][0]["kind"], "group");
    assert_eq!(value["nodes"][2]["kind"], "drawable");
    assert_eq!(value["nodes"][3]["kind"], "custom");
    assert_eq!(value["geometries"][0]["attributes"][0]["componentType"], "f32");

    let back: SerializedDisplay = serde_json::from_str(&text).expect("from json");
    assert_eq!(back, flat);
    assert_eq!(deserialize(&back, &buffers).expect("deserialize"), original);
}

#[test]
fn buffers_are_listed_once_per_array() {
    let original = sample();
    let (flat, buffers) = serialize(&original);
    // position, color, index, overlay points, overlay segments
    assert_eq!(buffers.len(), 5);
    assert_eq!(buffers[0].len(), 8 * 3 * 4);
    assert_eq!(buffers[1].len(), 24);
    assert_eq!(buffers[2].len(), 12 * 4);
    assert!(matches!(flat.nodes[2].kind, FlatNodeKind::Drawable { geometry: 0, .. }));
}

#[test]
fn shared_geometry_stays_shared() {
    let geometry = Arc::new(cube_geometry());
    let drawable = Drawable {
        primitive: PrimitiveKind::Lines,
        geometry,
        material: Material::default(),
    };
    let mut scene = SceneNode::group("root");
    scene.push_child(SceneNode::drawable("a", drawable.clone()));
    scene.push_child(SceneNode::drawable("b", drawable));
    let payload = DisplayPayload {
        scene,
        overlay: Overlay::default(),
    };
    let (flat, buffers) = serialize(&payload);
    let restored = deserialize(&flat, &buffers).expect("deserialize");
    let geometry = |i: usize| match &restored.scene.children[i].payload {
        Some(Payload::Drawable(d)) => Arc::clone(&d.geometry),
        _ => panic!("drawable"),
    };
    assert!(Arc::ptr_eq(&geometry(0), &geometry(1)));
}

#[test]
fn malformed_transfer_lists_are_rejected() {
    let (flat, mut buffers) = serialize(&sample());

    let short = buffers[..1].to_vec();
    assert!(matches!(deserialize(&flat, &short), Err(CodecError::MissingBuffer(1))));

    buffers[0] = TransferBuffer::from_bytes(vec![0; 7]);
    assert_eq!(
        deserialize(&flat, &buffers),
        Err(CodecError::BufferLength {
            buffer: 0,
            expected: 96,
            actual: 7
        })
    );
}

#[test]
fn oversized_counts_are_rejected_without_overflow() {
    let (mut flat, buffers) = serialize(&sample());
    let overlay = flat.overlay.as_mut().expect("sample has an overlay");
    overlay.point_count = usize::MAX / 8;
    let points = overlay.points;
    assert_eq!(
        deserialize(&flat, &buffers),
        Err(CodecError::SizeOverflow {
            buffer: points,
            count: usize::MAX / 8,
            item_bytes: 24
        })
    );

    let (mut flat, buffers) = serialize(&sample());
    for attr in &mut flat.geometries[0].attributes {
        if attr.component_type.byte_size() > 1 {
            attr.count = usize::MAX;
        }
    }
    assert!(matches!(
        deserialize(&flat, &buffers),
        Err(CodecError::SizeOverflow { count: usize::MAX, .. })
    ));
}

#[test]
fn cyclic_flat_description_is_rejected() {
    let (mut flat, buffers) = serialize(&sample());
    flat.nodes[1].children.push(0);
    assert_eq!(deserialize(&flat, &buffers), Err(CodecError::NodeRevisited(0)));
}
