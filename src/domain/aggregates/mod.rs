//! Aggregates module
pub mod product;
pub mod customer;
pub mod cart;
pub mod order;
pub mod payment;

pub use product::{Accessory, AccessoryCategory, AccessoryDraft, Brand, BrandDraft, MobilePhone, PhoneDraft, PhoneOs, ProductSummary};
pub use customer::{Customer, NewCustomer, PasswordChange, ProfileUpdate, Registration};
pub use cart::{Cart, CartLine, PricedCart, PricedCartLine};
pub use order::{CheckoutPlan, CheckoutRequest, NewOrder, NewOrderLine, Order, OrderDetails, OrderError, OrderLine, OrderStatus};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentRequest, PaymentStatus};
