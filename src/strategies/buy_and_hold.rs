use crate::models::*;

pub struct BuyAndHoldStrategy {
    template_id: String,
}

impl BuyAndHoldStrategy {
    pub fn new() -> Self {
        Self {
            template_id: "buy_and_hold".to_string(),
        }
    }
}

impl Default for BuyAndHoldStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl super::SignalEvaluator for BuyAndHoldStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    // Always Buy: the simulator opens on the first evaluated bar and never closes.
    fn generate_signal(&self, _bars: &[PriceBar], _bar_index: usize) -> SignalAction {
        SignalAction::Buy
    }

    fn get_min_data_points(&self) -> usize {
        0
    }
}
