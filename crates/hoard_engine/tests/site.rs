use hoard_core::{AssetRef, FailureKind, ItemId};
use hoard_engine::{AjaxGallerySite, ItemMeta, SiteApi, Target};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn endpoints_follow_the_site_layout() {
    let site = AjaxGallerySite::default();
    let item = ItemId::from("123");

    assert_eq!(site.item_page_url(&item), "https://www.pixiv.net/artworks/123");
    assert_eq!(site.gallery_url("7"), "https://www.pixiv.net/users/7/artworks");
    assert_eq!(site.gallery_page_url("7", 2), "https://www.pixiv.net/users/7/artworks?p=2");
    assert_eq!(
        site.bulk_listing_url("7"),
        "https://www.pixiv.net/ajax/user/7/profile/all?lang=en"
    );
    assert_eq!(
        site.page_listing_url(&item),
        "https://www.pixiv.net/ajax/illust/123/pages?lang=en"
    );
    assert_eq!(site.item_meta_url(&item), "https://www.pixiv.net/ajax/illust/123?lang=en");
    assert_eq!(
        site.composite_meta_url(&item),
        "https://www.pixiv.net/ajax/illust/123/ugoira_meta?lang=en"
    );
}

#[test]
fn galleries_from_ids_and_profile_urls() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.parse_target(" 4242 "),
        Some(Target::Gallery("4242".to_string()))
    );
    assert_eq!(
        site.parse_target("https://www.pixiv.net/en/users/4242/illustrations"),
        Some(Target::Gallery("4242".to_string()))
    );
}

#[test]
fn artwork_urls_are_single_items() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.parse_target("https://www.pixiv.net/en/artworks/99?ref=x"),
        Some(Target::Item(ItemId::from("99")))
    );
}

#[test]
fn other_pages_are_scanned_for_links() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.parse_target("https://www.pixiv.net/bookmark_new_illust.php"),
        Some(Target::Page(
            "https://www.pixiv.net/bookmark_new_illust.php".to_string()
        ))
    );
    assert_eq!(
        site.parse_target("https://www.pixiv.net/artworks/99/likes"),
        Some(Target::Page(
            "https://www.pixiv.net/artworks/99/likes".to_string()
        ))
    );
}

#[test]
fn unrecognised_input_is_no_target() {
    let site = AjaxGallerySite::default();
    assert_eq!(site.parse_target("someone"), None);
    assert_eq!(site.parse_target(""), None);
    assert_eq!(site.parse_target("ftp://www.pixiv.net/users/1"), None);
}

#[test]
fn item_links_ignore_query_and_fragment() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.item_id_from_link("https://www.pixiv.net/en/artworks/99?ref=top#comments"),
        Some(ItemId::from("99"))
    );
    assert_eq!(site.item_id_from_link("https://www.pixiv.net/artworks/99/likes"), None);
    assert_eq!(site.item_id_from_link("https://www.pixiv.net/users/99"), None);
}

#[test]
fn bulk_listing_takes_numeric_keys_of_both_sections() {
    let site = AjaxGallerySite::default();
    let payload = json!({"error": false, "body": {
        "illusts": {"100": null, "20": null, "bad": null},
        "manga": [],
        "novels": {"5": null}
    }});

    let mut found = site.parse_bulk_listing(&payload);
    found.sort();

    assert_eq!(found, vec![ItemId::from("20"), ItemId::from("100")]);
}

#[test]
fn item_meta_reads_page_count_and_composite_flag() {
    let site = AjaxGallerySite::default();
    let payload = json!({"body": {
        "illustType": "2",
        "pageCount": 1,
        "urls": {"original": null}
    }});

    assert_eq!(
        site.parse_item_meta(&payload),
        Ok(ItemMeta {
            first_page_url: None,
            page_count: 1,
            composite: true,
        })
    );
    assert_eq!(
        site.parse_item_meta(&json!({"body": []})),
        Err(FailureKind::MalformedPayload)
    );
}

#[test]
fn absent_page_count_means_one_page() {
    let site = AjaxGallerySite::default();
    let meta = site.parse_item_meta(&json!({"body": {"pageCount": null}}));
    assert_eq!(meta.map(|meta| meta.page_count), Ok(1));
}

#[test]
fn page_count_outside_u32_is_malformed() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.parse_item_meta(&json!({"body": {"pageCount": 5_000_000_000u64}})),
        Err(FailureKind::MalformedPayload)
    );
    assert_eq!(
        site.parse_item_meta(&json!({"body": {"pageCount": -3}})),
        Err(FailureKind::MalformedPayload)
    );
    assert_eq!(
        site.parse_item_meta(&json!({"body": {"pageCount": "many"}})),
        Err(FailureKind::MalformedPayload)
    );
}

#[test]
fn composite_meta_needs_a_source() {
    let site = AjaxGallerySite::default();
    assert_eq!(
        site.parse_composite_meta(&json!({"body": {"originalSrc": " https://i.pximg.net/img-zip-ugoira/8.zip "}})),
        Some("https://i.pximg.net/img-zip-ugoira/8.zip".to_string())
    );
    assert_eq!(site.parse_composite_meta(&json!({"body": {"originalSrc": ""}})), None);
}

#[test]
fn only_originals_pass_the_asset_filter() {
    let site = AjaxGallerySite::default();
    let item = ItemId::from("5");

    assert!(site.is_original_asset(&AssetRef::page(
        &item,
        "https://i.pximg.net/img-original/img/2024/01/01/5_p0.png",
        0
    )));
    assert!(!site.is_original_asset(&AssetRef::page(
        &item,
        "https://i.pximg.net/c/250x250_80_a2/img-master/img/5_p0_square1200.jpg",
        0
    )));
    assert!(site.is_original_asset(&AssetRef::composite(
        &item,
        "https://i.pximg.net/img-zip-ugoira/img/5_ugoira1920x1080.zip"
    )));
    assert!(!site.is_original_asset(&AssetRef::composite(
        &item,
        "https://i.pximg.net/img-original/img/5_p0.png"
    )));
}
