//! Built-in FAQ flow: shipping, returns, ring sizing, gemstones and orders.

use std::collections::BTreeMap;

use super::{FlowGraph, FlowNode, QuickReply};

fn node(message: &str, quick_replies: Vec<QuickReply>) -> FlowNode {
    FlowNode {
        message: message.to_string(),
        quick_replies,
    }
}

/// The store's FAQ flow.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn faq_graph() -> FlowGraph {
    let starters = vec![
        QuickReply::to("Shipping & Fulfilment time", "shipping"),
        QuickReply::to("Return and Exchange Policy", "returns"),
        QuickReply::to("Ring Size Guide", "ring_size"),
        QuickReply::to("Gemstone Quiz", "gemstone_quiz"),
        QuickReply::to("Order Assistance", "order_assistance"),
    ];

    let mut nodes = BTreeMap::new();
    nodes.insert(
        "shipping".to_string(),
        node(
            "**Shipping & Fulfilment**\n\nWe aim to dispatch all orders within 1–3 business days. Standard delivery takes 5–10 business days; express options are available at checkout.\n\nWhat would you like to know more about?",
            vec![
                QuickReply::to("Track my order", "shipping_track"),
                QuickReply::to("International shipping", "shipping_intl"),
                QuickReply::to("Shipping delays", "shipping_delay"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "shipping_track".to_string(),
        node(
            "**Tracking Your Order**\n\nOnce your order ships you'll receive a confirmation email with a tracking link. Tracking updates may take up to 24 hours to appear after dispatch.\n\nFor real-time order status, our AI assistant can look up your order directly!",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to shipping", "shipping"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "shipping_intl".to_string(),
        node(
            "**International Shipping**\n\nWe ship to most countries worldwide. International delivery typically takes 10–20 business days depending on your location.\n\nPlease note:\n- Customs duties and import taxes are the buyer's responsibility\n- Some remote areas may have extended delivery times\n- We provide tracking on all international orders",
            vec![
                QuickReply::to("Track my order", "shipping_track"),
                QuickReply::to("Shipping delays", "shipping_delay"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "shipping_delay".to_string(),
        node(
            "**Shipping Delays**\n\nIf your order hasn't arrived within the expected timeframe, here's what to do:\n\n- Check your tracking link for the latest status\n- Allow an extra 3–5 business days during busy periods\n- Contact us if your order is more than 7 days overdue\n\nOur AI assistant can help you check your order status right now!",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Track my order", "shipping_track"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "returns".to_string(),
        node(
            "**Return & Exchange Policy**\n\nWe accept returns within 30 days of delivery for most items in their original, unworn condition.\n\nWhat would you like to know?",
            vec![
                QuickReply::to("How to start a return", "returns_process"),
                QuickReply::to("Refund timeline", "returns_refund"),
                QuickReply::to("Exchange an item", "returns_exchange"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "returns_process".to_string(),
        node(
            "**Starting a Return**\n\nTo initiate a return:\n\n1. Contact us within 30 days of delivery\n2. Provide your order number and reason for return\n3. We'll email you a prepaid return label\n4. Pack the item securely in its original packaging\n5. Drop off at your nearest post office\n\nCustomised or engraved items cannot be returned unless faulty.",
            vec![
                QuickReply::to("Refund timeline", "returns_refund"),
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "returns_refund".to_string(),
        node(
            "**Refund Timeline**\n\nOnce we receive your returned item:\n\n- Inspection takes 1–3 business days\n- Refunds are issued to your original payment method\n- Allow 5–10 business days for the funds to appear\n\nYou'll receive an email confirmation when your refund is processed.",
            vec![
                QuickReply::to("Exchange an item", "returns_exchange"),
                QuickReply::to("How to start a return", "returns_process"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "returns_exchange".to_string(),
        node(
            "**Exchanging an Item**\n\nWe're happy to exchange items for a different size or style.\n\nTo request an exchange:\n- Contact us within 30 days of delivery\n- Let us know your order number and the item you'd like instead\n- We'll hold your new item while we process the return\n\nIf the new item costs more, we'll send a payment link for the difference.",
            vec![
                QuickReply::to("How to start a return", "returns_process"),
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "ring_size".to_string(),
        node(
            "**Ring Size Guide**\n\nFinding your perfect ring size is important! What would you like help with?",
            vec![
                QuickReply::to("Size chart", "ring_size_chart"),
                QuickReply::to("How to measure my finger", "ring_size_tips"),
                QuickReply::to("I'm between two sizes", "ring_size_between"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "ring_size_chart".to_string(),
        node(
            "**Ring Size Chart (Inner Circumference)**\n\n- Size 5 — 49.3 mm\n- Size 6 — 51.9 mm\n- Size 7 — 54.4 mm\n- Size 8 — 57.0 mm\n- Size 9 — 59.5 mm\n- Size 10 — 62.1 mm\n- Size 11 — 64.6 mm\n- Size 12 — 67.2 mm\n\nMeasure the inner circumference of a ring that fits well, or wrap a thin strip of paper around your finger.",
            vec![
                QuickReply::to("How to measure my finger", "ring_size_tips"),
                QuickReply::to("I'm between two sizes", "ring_size_between"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "ring_size_tips".to_string(),
        node(
            "**How to Measure Your Finger**\n\n- Measure at the end of the day when fingers are slightly larger\n- Avoid measuring when fingers are cold or swollen\n- Wrap a thin strip of paper around the base of your finger\n- Mark where it overlaps and measure the length in millimetres\n- Compare to our size chart\n\n**Tip:** If your knuckle is larger than the base of your finger, size up and use a ring adjuster.",
            vec![
                QuickReply::to("Size chart", "ring_size_chart"),
                QuickReply::to("I'm between two sizes", "ring_size_between"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "ring_size_between".to_string(),
        node(
            "**Between Two Sizes?**\n\nIf you're between sizes, here's our advice:\n\n- For slim bands (under 4 mm): choose the smaller size\n- For wide bands (6 mm or more): choose the larger size\n- For everyday rings: size up for comfort\n\nStill unsure? Our AI assistant can help you find the right fit for a specific style!",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Size chart", "ring_size_chart"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gemstone_quiz".to_string(),
        node(
            "**Gemstone Quiz**\n\nLet's find your perfect gemstone! What's the main occasion for the piece?",
            vec![
                QuickReply::to("Everyday wear", "gem_everyday"),
                QuickReply::to("Special occasion", "gem_special"),
                QuickReply::to("Engagement or wedding", "gem_engagement"),
                QuickReply::to("Just browsing", "gem_all"),
            ],
        ),
    );
    nodes.insert(
        "gem_everyday".to_string(),
        node(
            "**Everyday Gemstones**\n\nFor daily wear, durability is key. Top picks:\n\n- **Moissanite** — Brilliant sparkle, near-diamond hardness, great value\n- **Sapphire** — Exceptional hardness, vivid colours, timeless\n- **Lab Diamond** — Classic beauty, maximum durability\n\nWhich would you like to know more about?",
            vec![
                QuickReply::to("Moissanite", "gem_moissanite"),
                QuickReply::to("Sapphire", "gem_sapphire"),
                QuickReply::to("Lab Diamond", "gem_lab_diamond"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_special".to_string(),
        node(
            "**Special Occasion Gemstones**\n\nFor a show-stopping piece, consider:\n\n- **Ruby** — Bold red, symbol of passion and elegance\n- **Sapphire** — Royal blue or fancy colours, stunning centrepieces\n- **Lab Diamond** — Unmatched brilliance and fire\n\nWhich interests you most?",
            vec![
                QuickReply::to("Ruby", "gem_ruby"),
                QuickReply::to("Sapphire", "gem_sapphire"),
                QuickReply::to("Lab Diamond", "gem_lab_diamond"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_engagement".to_string(),
        node(
            "**Engagement & Wedding Gemstones**\n\nA piece for a lifetime deserves careful thought:\n\n- **Lab Diamond** — Traditional brilliance, ethically sourced\n- **Moissanite** — Near-identical to diamond, exceptional fire, budget-friendly\n- **Sapphire** — Royal choice, extremely durable, a true heirloom\n\nWhich would you like to explore?",
            vec![
                QuickReply::to("Lab Diamond", "gem_lab_diamond"),
                QuickReply::to("Moissanite", "gem_moissanite"),
                QuickReply::to("Sapphire", "gem_sapphire"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_all".to_string(),
        node(
            "**All Our Gemstones**\n\nWe work with a curated selection of beautiful stones. Which would you like to explore?",
            vec![
                QuickReply::to("Sapphire", "gem_sapphire"),
                QuickReply::to("Moissanite", "gem_moissanite"),
                QuickReply::to("Ruby", "gem_ruby"),
                QuickReply::to("Lab Diamond", "gem_lab_diamond"),
            ],
        ),
    );
    nodes.insert(
        "gem_sapphire".to_string(),
        node(
            "**Sapphire**\n\nSapphires are one of the world's most prized gemstones.\n\n- **Hardness:** 9/10 — excellent for everyday wear\n- **Colours:** Classic blue, pink, yellow, white, padparadscha\n- **Symbolism:** Loyalty, wisdom, and nobility\n- **Care:** Clean with warm soapy water; safe for ultrasonic cleaning\n\nOur AI assistant can help you find a sapphire piece that matches your style!",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to gemstone quiz", "gemstone_quiz"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_moissanite".to_string(),
        node(
            "**Moissanite**\n\nOriginally discovered in a meteorite, moissanite is nature's most brilliant gem.\n\n- **Hardness:** 9.25/10 — nearly as hard as diamond\n- **Brilliance:** Higher refractive index than diamond — stunning fire\n- **Ethics:** Lab-created, conflict-free\n- **Value:** Exceptional quality at a fraction of the diamond price",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to gemstone quiz", "gemstone_quiz"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_ruby".to_string(),
        node(
            "**Ruby**\n\nRubies are the gemstone of passion and vitality.\n\n- **Hardness:** 9/10 — excellent durability\n- **Colour:** Rich red to pinkish-red; the finest are \"pigeon blood\" red\n- **Symbolism:** Love, courage, and protection\n- **Care:** Avoid harsh chemicals; clean with warm soapy water",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to gemstone quiz", "gemstone_quiz"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "gem_lab_diamond".to_string(),
        node(
            "**Lab-Grown Diamond**\n\nIdentical to mined diamonds in every way, just created sustainably.\n\n- **Hardness:** 10/10 — the hardest natural substance\n- **Appearance:** Chemically, physically, and optically identical to mined diamonds\n- **Ethics:** No mining, minimal environmental impact\n- **Value:** Typically 50–70% less than equivalent mined diamonds",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to gemstone quiz", "gemstone_quiz"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "order_assistance".to_string(),
        node(
            "**Order Assistance**\n\nHow can we help with your order?",
            vec![
                QuickReply::to("Check order status", "order_status"),
                QuickReply::to("Change or cancel an order", "order_change"),
                QuickReply::to("Received the wrong item", "order_wrong_item"),
                QuickReply::to("Item arrived damaged", "order_damaged"),
            ],
        ),
    );
    nodes.insert(
        "order_status".to_string(),
        node(
            "**Check Order Status**\n\nOur AI assistant can look up your order status in real time! Just ask:\n\n\"What's the status of my order?\"\n\nYou may need to log in so we can securely access your order information.",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to order help", "order_assistance"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "order_change".to_string(),
        node(
            "**Change or Cancel an Order**\n\nWe can make changes to your order within **1 hour** of placing it.\n\nAfter that, your order may already be in production or dispatched.\n\nOur AI assistant can check your order details and advise what's possible right now.",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to order help", "order_assistance"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "order_wrong_item".to_string(),
        node(
            "**Received the Wrong Item?**\n\nWe're so sorry about that! Please:\n\n1. Take a photo of the item you received\n2. Note your order number\n3. Contact us — we'll arrange a replacement or refund immediately\n\nOur AI assistant can start this process for you right now.",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to order help", "order_assistance"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );
    nodes.insert(
        "order_damaged".to_string(),
        node(
            "**Item Arrived Damaged?**\n\nWe take great care with packaging, but sometimes damage occurs in transit. Here's what to do:\n\n1. Take clear photos of the damage and packaging\n2. Note your order number\n3. Contact us within 48 hours of delivery\n\nWe'll send a replacement or issue a full refund — no need to return the damaged item.",
            vec![
                QuickReply::escape("Ask the AI assistant"),
                QuickReply::to("Back to order help", "order_assistance"),
                QuickReply::restart("Back to main topics"),
            ],
        ),
    );

    FlowGraph { starters, nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ReplyTarget;

    #[test]
    fn test_faq_graph_links_resolve() {
        let graph = faq_graph();
        graph.validate().expect("every link resolves");
        assert_eq!(graph.starters.len(), 5);
        assert_eq!(graph.nodes.len(), 26);
    }

    #[test]
    fn test_ring_size_node() {
        let graph = faq_graph();
        let ring_size = graph.node("ring_size").expect("ring_size");
        let targets: Vec<_> = ring_size.quick_replies.iter().map(|r| &r.next).collect();
        assert_eq!(
            targets,
            vec![
                &ReplyTarget::Node("ring_size_chart".to_string()),
                &ReplyTarget::Node("ring_size_tips".to_string()),
                &ReplyTarget::Node("ring_size_between".to_string()),
                &ReplyTarget::Restart,
            ]
        );
    }

    #[test]
    fn test_every_node_has_replies() {
        for (id, node) in &faq_graph().nodes {
            assert!(!node.quick_replies.is_empty(), "{id} has no replies");
        }
    }
}
