//! Inventory rules that do not touch the database.
//!
//! Services load rows, ask these functions what to do, then persist the
//! outcome.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    entity::orders::OrderStatus,
    error::{AppError, AppResult, FieldError},
};

pub const DEFAULT_CATEGORY: &str = "medical_tools";
/// Catalog filter value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

const MAX_USERNAME_LEN: usize = 150;
const MAX_PRODUCT_NAME_LEN: usize = 100;
const MAX_CATEGORY_LEN: usize = 50;

pub struct RegistrationInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Collects every field problem with a registration so they can be shown together.
pub fn validate_registration(
    input: &RegistrationInput<'_>,
    username_taken: bool,
    email_taken: bool,
) -> AppResult<()> {
    let mut errors = Vec::new();

    if input.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if input.username.chars().count() > MAX_USERNAME_LEN {
        errors.push(FieldError::new(
            "username",
            format!("Username must be at most {MAX_USERNAME_LEN} characters"),
        ));
    } else if username_taken {
        errors.push(FieldError::new("username", "Username is already taken"));
    }

    if input.email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !looks_like_email(input.email) {
        errors.push(FieldError::new("email", "Enter a valid email address"));
    } else if email_taken {
        errors.push(FieldError::new("email", "Email is already in use"));
    }

    if input.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if input.password != input.confirm_password {
        errors.push(FieldError::new("confirm_password", "Passwords do not match"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Checks the product fields that are present; `None` means "not being changed".
pub fn validate_product_fields(
    name: Option<&str>,
    quantity: Option<i32>,
    category: Option<&str>,
) -> AppResult<()> {
    let mut errors = Vec::new();

    if let Some(name) = name {
        if name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        } else if name.chars().count() > MAX_PRODUCT_NAME_LEN {
            errors.push(FieldError::new(
                "name",
                format!("Name must be at most {MAX_PRODUCT_NAME_LEN} characters"),
            ));
        }
    }

    if let Some(quantity) = quantity {
        if quantity < 0 {
            errors.push(FieldError::new("quantity", "Quantity cannot be negative"));
        }
    }

    if let Some(category) = category {
        if category.trim().is_empty() {
            errors.push(FieldError::new("category", "Category cannot be blank"));
        } else if category.chars().count() > MAX_CATEGORY_LEN {
            errors.push(FieldError::new(
                "category",
                format!("Category must be at most {MAX_CATEGORY_LEN} characters"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// A quantity added to the cart must be positive and within current stock.
/// The merged cart total is not re-checked here; checkout re-validates it.
pub fn check_add_quantity(requested: i32, available: i32) -> AppResult<()> {
    if requested <= 0 {
        return Err(AppError::field("quantity", "Quantity must be greater than 0"));
    }
    if requested > available {
        return Err(AppError::field(
            "quantity",
            format!("Quantity {requested} exceeds available stock {available}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    Set(i32),
    Remove,
    Reject { available: i32 },
}

/// Collapses repeated line ids to the last requested quantity, keeping the
/// position of each id's first appearance.
pub fn last_quantity_per_line(updates: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
    let mut collapsed: Vec<(Uuid, i32)> = Vec::with_capacity(updates.len());
    for &(line_id, quantity) in updates {
        match collapsed.iter_mut().find(|(id, _)| *id == line_id) {
            Some(entry) => entry.1 = quantity,
            None => collapsed.push((line_id, quantity)),
        }
    }
    collapsed
}

pub fn plan_line_update(requested: i32, available: i32) -> LineUpdate {
    if requested <= 0 {
        LineUpdate::Remove
    } else if requested <= available {
        LineUpdate::Set(requested)
    } else {
        LineUpdate::Reject { available }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StockLine<'a> {
    pub product: &'a str,
    pub requested: i32,
    pub available: i32,
}

pub fn check_stock(line: StockLine<'_>) -> AppResult<()> {
    if line.requested > line.available {
        return Err(AppError::InsufficientStock {
            product: line.product.to_string(),
            requested: line.requested,
            available: line.available,
        });
    }
    Ok(())
}

/// Checkout is all-or-nothing: the first line over stock fails the whole cart.
pub fn check_checkout(lines: &[StockLine<'_>]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    lines.iter().copied().try_for_each(check_stock)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply(OrderStatus),
    /// The order already left `Pending`; nothing changes.
    AlreadyFinal(OrderStatus),
}

pub fn order_transition(current: OrderStatus, decision: Decision) -> Transition {
    if current.is_terminal() {
        return Transition::AlreadyFinal(current);
    }
    match decision {
        Decision::Approve => Transition::Apply(OrderStatus::Approved),
        Decision::Reject => Transition::Apply(OrderStatus::Rejected),
    }
}

pub fn report_month(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// `None` when the filter should not restrict the catalog.
pub fn category_filter(category: Option<&str>) -> Option<&str> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
}

/// Builds a case-insensitive substring pattern with LIKE metacharacters escaped.
pub fn name_search_pattern(q: &str) -> Option<String> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(q.len() + 2);
    escaped.push('%');
    for ch in q.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn registration<'a>(password: &'a str, confirm: &'a str) -> RegistrationInput<'a> {
        RegistrationInput {
            username: "nurse1",
            email: "nurse1@clinic.org",
            password,
            confirm_password: confirm,
        }
    }

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(validate_registration(&registration("pw", "pw"), false, false).is_ok());
    }

    #[test]
    fn registration_reports_every_failing_field() {
        let err = validate_registration(&registration("pw", "other"), true, true).unwrap_err();
        assert_eq!(fields(err), vec!["username", "email", "confirm_password"]);
    }

    #[test]
    fn registration_rejects_malformed_email() {
        let input = RegistrationInput {
            username: "a",
            email: "not-an-email",
            password: "pw",
            confirm_password: "pw",
        };
        assert_eq!(
            fields(validate_registration(&input, false, false).unwrap_err()),
            vec!["email"]
        );
        assert!(looks_like_email("x@y.io"));
        assert!(!looks_like_email("x@localhost."));
        assert!(!looks_like_email("a b@c.d"));
    }

    #[test]
    fn product_fields_validate_only_what_is_present() {
        assert!(validate_product_fields(None, None, None).is_ok());
        assert!(validate_product_fields(Some("Gloves"), Some(0), Some("ppe")).is_ok());
        let err = validate_product_fields(Some("  "), Some(-1), Some("")).unwrap_err();
        assert_eq!(fields(err), vec!["name", "quantity", "category"]);
    }

    #[test]
    fn add_quantity_must_be_positive_and_in_stock() {
        assert!(check_add_quantity(2, 5).is_ok());
        assert!(check_add_quantity(5, 5).is_ok());
        assert!(check_add_quantity(0, 5).is_err());
        assert!(check_add_quantity(-3, 5).is_err());
        assert!(check_add_quantity(6, 5).is_err());
    }

    #[test]
    fn line_update_sets_removes_or_rejects() {
        assert_eq!(plan_line_update(3, 5), LineUpdate::Set(3));
        assert_eq!(plan_line_update(5, 5), LineUpdate::Set(5));
        assert_eq!(plan_line_update(0, 5), LineUpdate::Remove);
        assert_eq!(plan_line_update(-1, 5), LineUpdate::Remove);
        assert_eq!(plan_line_update(9, 5), LineUpdate::Reject { available: 5 });
    }

    #[test]
    fn repeated_line_ids_keep_last_quantity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let collapsed = last_quantity_per_line(&[(a, 2), (b, 1), (a, 0), (a, 4)]);
        assert_eq!(collapsed, vec![(a, 4), (b, 1)]);
        assert!(last_quantity_per_line(&[]).is_empty());
    }

    #[test]
    fn empty_checkout_is_rejected() {
        assert!(matches!(check_checkout(&[]), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn checkout_fails_on_first_line_over_stock() {
        let lines = [
            StockLine {
                product: "Gloves",
                requested: 2,
                available: 10,
            },
            StockLine {
                product: "Masks",
                requested: 7,
                available: 3,
            },
            StockLine {
                product: "Gauze",
                requested: 9,
                available: 1,
            },
        ];
        match check_checkout(&lines) {
            Err(AppError::InsufficientStock {
                product,
                requested,
                available,
            }) => {
                assert_eq!(product, "Masks");
                assert_eq!(requested, 7);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn orders_leave_pending_exactly_once() {
        assert_eq!(
            order_transition(OrderStatus::Pending, Decision::Approve),
            Transition::Apply(OrderStatus::Approved)
        );
        assert_eq!(
            order_transition(OrderStatus::Pending, Decision::Reject),
            Transition::Apply(OrderStatus::Rejected)
        );
        for status in [OrderStatus::Approved, OrderStatus::Rejected] {
            for decision in [Decision::Approve, Decision::Reject] {
                assert_eq!(
                    order_transition(status, decision),
                    Transition::AlreadyFinal(status)
                );
            }
        }
    }

    #[test]
    fn second_approval_against_drained_stock_fails() {
        let err = check_stock(StockLine {
            product: "Saline",
            requested: 6,
            available: 4,
        })
        .unwrap_err();
        assert!(err.to_string().contains("quantity 6 > available 4"));
    }

    #[test]
    fn report_month_is_year_dash_month() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(report_month(at), "2025-03");
    }

    #[test]
    fn all_and_blank_categories_do_not_filter() {
        assert_eq!(category_filter(None), None);
        assert_eq!(category_filter(Some("all")), None);
        assert_eq!(category_filter(Some(" ")), None);
        assert_eq!(category_filter(Some("ppe")), Some("ppe"));
    }

    #[test]
    fn search_pattern_escapes_like_wildcards() {
        assert_eq!(name_search_pattern(""), None);
        assert_eq!(name_search_pattern("mask").as_deref(), Some("%mask%"));
        assert_eq!(name_search_pattern("50%_off").as_deref(), Some("%50\\%\\_off%"));
    }
}
