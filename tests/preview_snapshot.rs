use formdesk_core::{
    core::preview::render_preview,
    domain::{option_tree::text_entry, Field, FieldType, FileValue, OptionNode},
};

#[test]
fn preview_text_for_mixed_form() {
    let mut brochure = Field::new(FieldType::File).named("Brochure");
    brochure.attachment = Some(FileValue::new("brochure.pdf", vec![1, 2, 3]));
    let fields = vec![
        Field::new(FieldType::Text).named("Title").required(),
        Field::new(FieldType::NestedSelect)
            .named("Kit")
            .with_options(vec![
                OptionNode::group("Sizes", vec![OptionNode::leaf("S"), OptionNode::leaf("M")]),
                OptionNode::package(
                    "Box",
                    vec![text_entry("colour", "red"), text_entry("image", "box.png")],
                ),
            ]),
        Field::new(FieldType::Radio),
        brochure,
    ];

    insta::assert_snapshot!(render_preview(&fields).render_text(), @r###"
    Title * [text input]
      placeholder: Enter title
    Kit [nested dropdown]
      + Sizes
        - S
        - M
      + Box {colour, image}
    Untitled field 3 [radio group]
      - (no options)
    Brochure [file upload]
      file: brochure.pdf
    "###);
}

#[test]
fn empty_form_preview() {
    assert_eq!(render_preview(&[]).render_text(), "(empty form)\n");
}
