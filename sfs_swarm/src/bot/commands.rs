//! Extension commands and request builders used by bots.

use crate::{
    config::BotConfig,
    facade::Request,
    net::payload::{SfsArray, SfsObject},
};

pub const INIT: &str = "init";
pub const ROOM_JOIN_COMPLETE: &str = "roomjoincomplete";
pub const WALK_REQUEST: &str = "walkrequest";
pub const SHOP_PRODUCT_LIST: &str = "shopproductlist";
/// Alternate name some servers answer shop listings with
pub const SHOP_PRODUCT_LIST_ALT: &str = "shopproductlistA";
pub const PURCHASE: &str = "purchase";
pub const CHANGE_CLOTHES: &str = "changeclothes";

/// Client flavor announced in the `init` handshake
const INIT_CLIENT: &str = "desktop";

/// Zone login carrying the username twice in the login params
pub fn login(config: &BotConfig) -> Request {
    let mut params = SfsObject::new();
    params
        .put_utf("username", config.username.as_str())
        .put_utf("loginName", config.username.as_str());
    Request::Login {
        username: config.username.clone(),
        password: config.password.clone(),
        params,
        zone: config.zone.clone(),
    }
}

pub fn init() -> Request {
    let mut params = SfsObject::new();
    params.put_utf("client", INIT_CLIENT);
    Request::extension(INIT, params)
}

pub fn room_join_complete() -> Request {
    Request::extension(ROOM_JOIN_COMPLETE, SfsObject::new())
}

pub fn walk(x: i32, y: i32) -> Request {
    let mut params = SfsObject::new();
    params.put_int("x", x).put_int("y", y);
    Request::extension(WALK_REQUEST, params)
}

pub fn shop_product_list(shop_id: i32) -> Request {
    let mut params = SfsObject::new();
    params.put_int("shopID", shop_id);
    Request::extension(SHOP_PRODUCT_LIST, params)
}

/// Buy one unit of a product. A `color` of 0 means no color and is left out.
pub fn purchase(shop_id: i32, product_id: i32, color: i32) -> Request {
    let mut item = SfsObject::new();
    item.put_int("shopProductID", product_id).put_int("quantity", 1);
    if color > 0 {
        item.put_int("color", color);
    }
    let mut items = SfsArray::new();
    items.add_object(item);

    let mut params = SfsObject::new();
    params.put_int("shopID", shop_id).put_array("items", items);
    Request::extension(PURCHASE, params)
}

/// Wear a clip. A `color` of 0 means no color and is left out.
pub fn change_clothes(clip: &str, color: i32) -> Request {
    let mut params = SfsObject::new();
    params.put_utf("clip", clip);
    if color > 0 {
        params.put_int("color", color);
    }
    Request::extension(CHANGE_CLOTHES, params)
}

pub fn is_shop_listing(command: &str) -> bool {
    command == SHOP_PRODUCT_LIST || command == SHOP_PRODUCT_LIST_ALT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(request: &Request) -> &SfsObject {
        match request {
            Request::Extension { params, .. } => params,
            other => panic!("not an extension request: {other:?}"),
        }
    }

    #[test]
    fn test_login_params() {
        let config = BotConfig::new("h", 1, "World", "bot01");
        match login(&config) {
            Request::Login {
                username,
                params,
                zone,
                ..
            } => {
                assert_eq!(username, "bot01");
                assert_eq!(zone, "World");
                assert_eq!(params.get_utf("username"), Some("bot01"));
                assert_eq!(params.get_utf("loginName"), Some("bot01"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_purchase_omits_zero_color() {
        let plain = purchase(3, 5, 0);
        let item = params(&plain).get_array("items").unwrap().get_object(0).unwrap();
        assert_eq!(item.get_int("shopProductID"), Some(5));
        assert_eq!(item.get_int("quantity"), Some(1));
        assert!(!item.contains_key("color"));
        assert_eq!(params(&plain).get_int("shopID"), Some(3));

        let colored = purchase(3, 5, 9);
        let item = params(&colored).get_array("items").unwrap().get_object(0).unwrap();
        assert_eq!(item.get_int("color"), Some(9));
    }

    #[test]
    fn test_change_clothes_omits_zero_color() {
        assert!(!params(&change_clothes("hat", 0)).contains_key("color"));
        assert_eq!(params(&change_clothes("hat", 2)).get_int("color"), Some(2));
        assert_eq!(params(&change_clothes("hat", 2)).get_utf("clip"), Some("hat"));
    }

    #[test]
    fn test_shop_listing_names() {
        assert!(is_shop_listing("shopproductlist"));
        assert!(is_shop_listing("shopproductlistA"));
        assert!(!is_shop_listing("purchase"));
    }
}
