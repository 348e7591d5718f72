//! The API endpoints URIs.
//!
//! Routes ending in `{email}` are the user-scoped variants of the route without it.

/// The root of the API, answers with a banner.
pub const CART_ROOT: &str = "/Cart";
/// The route to get an unscoped statement with its line items.
pub const CART_ITEMS: &str = "/Cart/CartItems/{ref_key}";
/// The route to get a user's statement with its line items.
pub const USER_CART_ITEMS: &str = "/Cart/CartItems/{ref_key}/{email}";
/// The route to count the unscoped statements with a reference.
pub const CHECK_REF_KEY: &str = "/Cart/CheckRefKey/{ref_key}";
/// The route to count a user's statements with a reference.
pub const USER_CHECK_REF_KEY: &str = "/Cart/CheckRefKey/{ref_key}/{email}";
/// The route to create a statement or merge items into it.
pub const CREATE_CART: &str = "/Cart/CartItemIns";
/// The route to get the unscoped statements for a list of references.
pub const YEAR_DETAIL: &str = "/Cart/YearDetail";
/// The route to get a user's statements for a list of references.
pub const USER_YEAR_DETAIL: &str = "/Cart/YearDetail/{email}";
/// The route to update the values and labels of a statement.
pub const UPDATE_CART: &str = "/Cart/CartItemsUpd";
/// The route to delete a single line item.
pub const DELETE_LINE_ITEM: &str = "/Cart/CartDetailItem/{item_id}";
/// The route to delete an unscoped statement.
pub const DELETE_STATEMENT: &str = "/Cart/ItemsDetail/{ref_key}";
/// The route to delete a user's statement.
pub const DELETE_USER_STATEMENT: &str = "/Cart/ItemsDetail/{ref_key}/{email}";

/// Replace each parameter in `endpoint_path` with the next value in `values`.
///
/// A parameter is a string that starts with a left brace, followed by lowercase letters or
/// underscores, and ends with a right brace. For example, in the endpoint path
/// '/Cart/CartItems/{ref_key}', '{ref_key}' is the parameter.
///
/// Parameters without a matching value are left as they are.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, values: &[&str]) -> String {
    let mut formatted = String::with_capacity(endpoint_path.len());
    let mut values = values.iter();
    let mut rest = endpoint_path;

    while let Some(param_start) = rest.find('{') {
        let Some(param_len) = rest[param_start..].find('}') else {
            break;
        };
        let param_end = param_start + param_len + 1;

        formatted.push_str(&rest[..param_start]);
        match values.next() {
            Some(value) => formatted.push_str(value),
            None => formatted.push_str(&rest[param_start..param_end]),
        }
        rest = &rest[param_end..];
    }

    formatted.push_str(rest);
    formatted
}
