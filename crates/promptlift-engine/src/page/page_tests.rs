use super::*;

fn composer_page() -> SnapshotPage {
    SnapshotPage::from_snapshot(PageSnapshot {
        url: "https://chat.example.com/".to_string(),
        viewport: ViewportInfo::default(),
        nodes: vec![
            SnapshotNode::new("form")
                .key("form")
                .bbox(200.0, 600.0, 800.0, 100.0)
                .child(
                    SnapshotNode::new("textarea")
                        .key("input")
                        .bbox(210.0, 610.0, 700.0, 80.0),
                )
                .child(
                    SnapshotNode::new("div")
                        .key("rich")
                        .attr("contenteditable", "true")
                        .bbox(210.0, 610.0, 10.0, 10.0)
                        .child(SnapshotNode::new("p").key("para").text("draft")),
                ),
        ],
    })
}

#[test]
fn test_bounding_box_contains() {
    let bbox = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
    assert!(bbox.contains(Point::new(50.0, 40.0)));
    assert!(!bbox.contains(Point::new(0.0, 0.0)));
    assert!(!bbox.contains(Point::new(200.0, 40.0)));
}

#[test]
fn test_bounding_box_expand_and_center() {
    let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0).expand(8.0);
    assert_eq!(bbox, BoundingBox::new(-8.0, -8.0, 116.0, 116.0));
    assert_eq!(bbox.center(), Point::new(50.0, 50.0));
}

#[test]
fn test_visibility_rules() {
    let mut info = ElementInfo {
        tag: "div".to_string(),
        attributes: Default::default(),
        style: ComputedStyle::default(),
        bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        text: String::new(),
    };
    assert!(info.is_visible());

    info.style.display = "none".to_string();
    assert!(!info.is_visible());

    info.style.display = "block".to_string();
    info.bbox.width = 0.0;
    assert!(!info.is_visible());
}

#[test]
fn test_editable_kind() {
    let page = composer_page();
    let textarea = page.find("input").unwrap();
    let rich = page.find("rich").unwrap();
    let form = page.find("form").unwrap();

    assert_eq!(page.info(textarea).unwrap().editable_kind(), EditableKind::TextControl);
    assert_eq!(page.info(rich).unwrap().editable_kind(), EditableKind::RichText);
    assert_eq!(page.info(form).unwrap().editable_kind(), EditableKind::None);
}

#[test]
fn test_elements_scope_starts_with_scope() {
    let page = composer_page();
    let form = page.find("form").unwrap();
    let scoped = page.elements(Some(form));
    assert_eq!(scoped[0], form);
    assert_eq!(scoped.len(), 4);
    assert_eq!(page.elements(None).len(), 4);
}

#[test]
fn test_detach_disconnects_subtree() {
    let mut page = composer_page();
    let rich = page.find("rich").unwrap();
    let para = page.find("para").unwrap();

    page.detach(rich);

    assert!(!page.is_connected(rich));
    assert!(!page.is_connected(para));
    assert!(page.find("rich").is_none());
    assert_eq!(
        page.assign_value(rich, "x"),
        Err(PageError::Detached(rich))
    );
}

#[test]
fn test_rich_text_reads_subtree() {
    let mut page = composer_page();
    let rich = page.find("rich").unwrap();
    assert_eq!(page.read_text(rich).as_deref(), Some("draft"));

    page.replace_content(rich, "new").unwrap();
    assert_eq!(page.read_text(rich).as_deref(), Some("new"));
    assert!(page.find("para").is_none());
}

#[test]
fn test_insert_text_requires_focus() {
    let mut page = composer_page();
    let textarea = page.find("input").unwrap();

    assert!(!page.insert_text(textarea, "hi").unwrap());

    page.focus(textarea).unwrap();
    assert!(page.insert_text(textarea, "hi").unwrap());
    assert!(page.insert_text(textarea, " there").unwrap());
    assert_eq!(page.read_text(textarea).as_deref(), Some("hi there"));

    page.select_all(textarea).unwrap();
    assert!(page.insert_text(textarea, "replaced").unwrap());
    assert_eq!(page.read_text(textarea).as_deref(), Some("replaced"));
}

#[test]
fn test_quirks_ignore_writes() {
    let mut page = SnapshotPage::new("https://x.test/", ViewportInfo::default());
    let id = page.append(
        None,
        SnapshotNode::new("textarea")
            .bbox(0.0, 0.0, 100.0, 40.0)
            .quirks(WriteQuirks {
                ignore_value_assignment: true,
                reject_insert_text: true,
                ..Default::default()
            }),
    );

    page.assign_value(id, "ignored").unwrap();
    assert_eq!(page.read_text(id).as_deref(), Some(""));

    page.focus(id).unwrap();
    assert!(!page.insert_text(id, "refused").unwrap());
}

#[test]
fn test_layers_lifecycle() {
    let mut page = composer_page();
    let id = page.mount_layer(Layer::new(LayerKind::Overlay, BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
    assert_eq!(page.layers_of(LayerKind::Overlay).len(), 1);

    page.update_layer(id, Layer::new(LayerKind::Overlay, BoundingBox::default()).hidden())
        .unwrap();
    assert!(!page.layer(id).unwrap().visible);

    page.remove_layer(id);
    assert!(page.layer(id).is_none());
    assert!(page.update_layer(id, Layer::new(LayerKind::Overlay, BoundingBox::default())).is_err());
}

#[test]
fn test_snapshot_json_parsing() {
    let json = r#"{
        "url": "https://claude.ai/new",
        "viewport": { "width": 1440, "height": 900 },
        "nodes": [
            { "tag": "DIV", "key": "editor",
              "attributes": { "contenteditable": "true" },
              "bbox": { "x": 0, "y": 700, "width": 600, "height": 80 },
              "text": "hello" }
        ]
    }"#;
    let page = SnapshotPage::from_json(json).unwrap();
    let editor = page.find("editor").unwrap();

    assert_eq!(page.viewport().width, 1440);
    assert_eq!(page.info(editor).unwrap().tag, "div");
    assert_eq!(page.read_text(editor).as_deref(), Some("hello"));
    assert!(is_interactable(&page, editor));
}

#[test]
fn test_ancestors_nearest_first() {
    let page = composer_page();
    let para = page.find("para").unwrap();
    let rich = page.find("rich").unwrap();
    let form = page.find("form").unwrap();
    assert_eq!(ancestors(&page, para), vec![rich, form]);
}
