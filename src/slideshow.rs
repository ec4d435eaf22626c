//! Browser slideshow written next to the processed images.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SLIDESHOW_FILENAME: &str = "index.html";

/// OpenWeatherMap lookup shown in the corner of the slideshow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSettings {
    pub api_key: String,
    pub zip_code: String,
}

#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub width: u32,
    pub height: u32,
    /// No weather lookup without an API key and ZIP code.
    pub weather: Option<WeatherSettings>,
}

impl SlideshowOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            weather: None,
        }
    }

    /// Enable weather only when both values are present and non-blank.
    pub fn with_weather(mut self, api_key: Option<&str>, zip_code: Option<&str>) -> Self {
        self.weather = match (api_key.map(str::trim), zip_code.map(str::trim)) {
            (Some(key), Some(zip)) if !key.is_empty() && !zip.is_empty() => Some(WeatherSettings {
                api_key: key.to_string(),
                zip_code: zip.to_string(),
            }),
            _ => None,
        };
        self
    }
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>Photo Slideshow - {{WIDTH}}x{{HEIGHT}}</title>
  <style>
    body {
      margin: 0;
      padding: 0;
      overflow: hidden;
      width: {{WIDTH}}px;
      height: {{HEIGHT}}px;
    }

    #slideshow {
      width: {{WIDTH}}px;
      height: {{HEIGHT}}px;
      position: fixed;
      top: 0;
      left: 0;
      background-color: lightgray;
      background-size: cover;
      background-position: center;
      background-repeat: no-repeat;
      z-index: -1;
    }

    #info {
      position: absolute;
      bottom: 30px;
      left: 30px;
      width: calc(100% - 60px);
      display: flex;
      justify-content: space-between;
      align-items: center;
      font-family: Arial, sans-serif;
      font-size: 64px;
      font-weight: bold;
      color: white;
      z-index: 100;
      text-shadow: 2px 0 0 #000, 0 -2px 0 #000, 0 2px 0 #000, -2px 0 0 #000;
    }

    #clock { text-align: left; }
    #weather { text-align: right; }
    #weather img { vertical-align: middle; width: 80px; height: 80px; }
  </style>
</head>
<body>
  <div id="slideshow"></div>
  <div id="info">
    <div id="clock"></div>
    <div id="weather"></div>
  </div>

  <script>
    var images = {{IMAGES}};
    var weather = {{WEATHER}};
    var lastWeatherUpdate = 0;

    function showRandomImage() {
      if (images.length === 0) {
        return;
      }
      var image = images[Math.floor(Math.random() * images.length)];
      document.getElementById("slideshow").style.backgroundImage = "url('" + image + "')";
    }

    function updateClock() {
      var now = new Date();
      var hours = now.getHours();
      var minutes = now.getMinutes();
      var period = hours >= 12 ? "PM" : "AM";
      hours = hours % 12 || 12;
      minutes = minutes < 10 ? "0" + minutes : minutes;
      document.getElementById("clock").textContent = hours + ":" + minutes + " " + period;
    }

    function updateWeather() {
      if (!weather) {
        return;
      }
      var now = Date.now();
      if (now - lastWeatherUpdate < 300000) {
        return;
      }
      lastWeatherUpdate = now;
      var url = "https://api.openweathermap.org/data/2.5/weather?zip=" +
        encodeURIComponent(weather.zipCode) + "&units=imperial&appid=" +
        encodeURIComponent(weather.apiKey);
      var div = document.getElementById("weather");
      fetch(url)
        .then(function (response) { return response.json(); })
        .then(function (data) {
          var icon = document.createElement("img");
          icon.src = "https://openweathermap.org/img/wn/" + data.weather[0].icon + "@2x.png";
          icon.alt = "weather icon";
          div.replaceChildren(icon, " " + Math.round(data.main.temp) + "°F");
        })
        .catch(function (error) {
          div.textContent = "Weather data not available";
          console.error("Error fetching weather data:", error);
        });
    }

    showRandomImage();
    updateClock();
    updateWeather();
    setInterval(showRandomImage, 60000);
    setInterval(updateClock, 1000);
    setInterval(updateWeather, 60000);
  </script>
</body>
</html>
"#;

/// Embed a JSON value in a `<script>` block.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize slideshow data")?;
    Ok(json.replace("</", "<\\/"))
}

/// Render the slideshow page for the given output filenames.
pub fn render_slideshow(filenames: &[String], options: &SlideshowOptions) -> Result<String> {
    let images: Vec<String> = filenames.iter().map(|name| format!("./{}", name)).collect();

    Ok(TEMPLATE
        .replace("{{WIDTH}}", &options.width.to_string())
        .replace("{{HEIGHT}}", &options.height.to_string())
        .replace("{{IMAGES}}", &script_json(&images)?)
        .replace("{{WEATHER}}", &script_json(&options.weather)?))
}

/// Write `index.html` into `output_dir` and return its path.
pub fn write_slideshow(
    output_dir: &Path,
    filenames: &[String],
    options: &SlideshowOptions,
) -> Result<PathBuf> {
    let html = render_slideshow(filenames, options)?;
    let path = output_dir.join(SLIDESHOW_FILENAME);

    fs::write(&path, html)
        .with_context(|| format!("Failed to write slideshow: {}", path.display()))?;

    Ok(path)
}
