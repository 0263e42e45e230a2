//! Cards shown at the top of the dashboard.

use maud::{Markup, html};

use crate::{
    auth::User,
    endpoints,
    html::{CARD_STYLE, LINK_STYLE, format_rupiah},
};

/// The greeting with the user's name and role.
pub(super) fn welcome_header(user: &User) -> Markup {
    html! {
        header class="flex justify-between items-baseline w-full mb-6"
        {
            h1 class="text-2xl font-bold" { "Welcome, " (user.name) " (" (user.role) ")" }

            a href=(endpoints::LOG_OUT) class=(LINK_STYLE) { "Log out" }
        }
    }
}

/// The sum of today's transactions.
pub(super) fn today_total_card(total: f64) -> Markup {
    let total_style = if total < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-gray-900 dark:text-white"
    };

    html! {
        section id="today-total" class={ (CARD_STYLE) " mb-6" }
        {
            h2 class="mb-2 text-sm font-medium text-gray-500 dark:text-gray-400"
            {
                "Today's total"
            }

            p class={ "text-3xl font-bold " (total_style) } { (format_rupiah(total)) }
        }
    }
}

/// Shown to guests in place of the transaction table.
pub(super) fn limited_access_notice() -> Markup {
    html! {
        section
            id="limited-access"
            role="status"
            class="w-full p-4 text-sm text-blue-800 rounded-lg bg-blue-50 dark:bg-gray-800 dark:text-blue-400"
        {
            p class="font-semibold" { "Limited access" }
            p { "Your account can only see today's total. Ask an administrator to manage transactions." }
        }
    }
}
