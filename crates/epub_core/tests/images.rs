use epub_core::{
    collect_image_sources, referenced_images, rewrite_images, DropReason, Fragment, ImageAsset,
    ImageMime, ImageOutcome, ImageSource, IMAGE_STYLE,
};
use pretty_assertions::assert_eq;

const FIVE_IMAGES: &str = r#"
<p>Intro text that is long enough.<img src="https://cdn.test/a.jpg" alt="A" width="640"></p>
<div><img data-src="/lazy/b.png"><img src="  "></div>
<figure><img src="c.gif"></figure>
<img src="d.jpg" srcset="d-2x.jpg 2x">
"#;

fn sources_of(html: &str) -> Vec<ImageSource> {
    collect_image_sources(&Fragment::parse(html))
}

#[test]
fn sources_are_numbered_in_document_order() {
    let sources = sources_of(FIVE_IMAGES);
    let expected = vec![
        ImageSource {
            index: 0,
            src: Some("https://cdn.test/a.jpg".to_string()),
        },
        ImageSource {
            index: 1,
            src: Some("/lazy/b.png".to_string()),
        },
        ImageSource { index: 2, src: None },
        ImageSource {
            index: 3,
            src: Some("c.gif".to_string()),
        },
        ImageSource {
            index: 4,
            src: Some("d.jpg".to_string()),
        },
    ];
    assert_eq!(sources, expected);
}

fn resolved(index: usize, mime: ImageMime) -> ImageOutcome {
    ImageOutcome::Resolved(ImageAsset::new(
        index,
        format!("ref-{index}"),
        mime,
        vec![index as u8; 4],
    ))
}

#[test]
fn failed_images_are_removed_and_the_rest_rewritten() {
    let mut body = Fragment::parse(FIVE_IMAGES);
    let outcomes = vec![
        resolved(0, ImageMime::Jpeg),
        resolved(1, ImageMime::Png),
        ImageOutcome::Dropped(DropReason::MissingSource),
        ImageOutcome::Dropped(DropReason::Unsupported("image/gif".to_string())),
        resolved(4, ImageMime::Jpeg),
    ];

    let assets = rewrite_images(&mut body, outcomes);

    let filenames: Vec<_> = assets.iter().map(|a| a.local_filename.as_str()).collect();
    assert_eq!(filenames, vec!["image_0.jpeg", "image_1.png", "image_4.jpeg"]);

    let mut imgs = Vec::new();
    body.for_each_element(|el| {
        if el.is("img") {
            imgs.push(el.attrs.clone());
        }
    });
    assert_eq!(imgs.len(), 3);
    assert_eq!(
        imgs[0],
        vec![
            ("src".to_string(), "images/image_0.jpeg".to_string()),
            ("alt".to_string(), String::new()),
            ("style".to_string(), IMAGE_STYLE.to_string()),
        ]
    );
    assert!(body.to_html().contains("<figure></figure>"));
    assert_eq!(referenced_images(&body).len(), assets.len());
}

#[test]
fn second_of_five_failing_leaves_four_images() {
    let mut body = Fragment::parse(
        r#"<img src="1"><img src="2"><img src="3"><img src="4"><img src="5">"#,
    );
    let outcomes = (0..5)
        .map(|i| {
            if i == 1 {
                ImageOutcome::Dropped(DropReason::Fetch("connection reset".to_string()))
            } else {
                resolved(i, ImageMime::Png)
            }
        })
        .collect();
    let assets = rewrite_images(&mut body, outcomes);
    assert_eq!(assets.len(), 4);
    assert_eq!(body.elements().count(), 4);
    assert_eq!(referenced_images(&body).len(), 4);
}

#[test]
fn mime_types_are_parsed_leniently() {
    assert_eq!(ImageMime::from_mime("image/jpeg"), Some(ImageMime::Jpeg));
    assert_eq!(ImageMime::from_mime("IMAGE/PNG; charset=binary"), Some(ImageMime::Png));
    assert_eq!(ImageMime::from_mime("image/webp"), None);
    assert_eq!(ImageMime::from_mime(""), None);
    assert_eq!(ImageMime::Jpeg.extension(), "jpeg");
}

#[test]
fn drop_reasons_read_well_in_logs() {
    assert_eq!(
        DropReason::Unsupported("image/svg+xml".to_string()).to_string(),
        "unsupported image type image/svg+xml"
    );
    assert_eq!(DropReason::MissingSource.to_string(), "image has no source");
}
