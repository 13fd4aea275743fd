use super::super::Model;
use yew::prelude::*;

/// Product recommendations for the diagnosed disease. Rendered only once
/// the lookup has answered; an empty answer is a normal outcome, not an
/// error.
pub fn render_product_list(model: &Model) -> Html {
    if !model.products_loaded {
        return html! {
            <div class="products-container">
                <p class="products-loading">
                    <i class="fa-solid fa-spinner fa-spin"></i>
                    {" Looking up product recommendations..."}
                </p>
            </div>
        };
    }

    if model.products.is_empty() {
        return html! {
            <div class="products-container">
                <p class="no-products">{"No product recommendations for this disease."}</p>
            </div>
        };
    }

    html! {
        <div class="products-container">
            <h3><i class="fa-solid fa-basket-shopping"></i>{" Recommended Products"}</h3>
            <div class="product-grid">
                { for model.products.iter().map(|product| html! {
                    <div class="product-card" key={product.id.clone()}>
                        <h4>{ &product.name }</h4>
                        <p class="product-description">{ &product.description }</p>
                        <div class="product-targets">
                            { for product.target_pests.iter().map(|pest| html! {
                                <span class="target-tag">{ pest }</span>
                            }) }
                        </div>
                    </div>
                }) }
            </div>
        </div>
    }
}
