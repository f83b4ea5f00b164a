use crate::driver::silabs::si7021::fahrenheit;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Reading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
}

impl Reading {
    pub fn fahrenheit(&self) -> f32 {
        fahrenheit(self.temperature)
    }

    /// Short post title, e.g. `21.4°C 48.3%`.
    pub fn title(&self) -> String {
        format!("{:.1}°C {:.1}%", self.temperature, self.humidity)
    }

    pub fn content(&self) -> String {
        format!(
            "Temperature in Celsius is : {:.2}°C Relative Humidity is : {:.2}%",
            self.temperature, self.humidity
        )
    }
}
